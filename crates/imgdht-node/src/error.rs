//! Node-engine error type, composed from the library crates below it via
//! `#[from]` (spec §7: configuration / protocol-violation / transient-I/O),
//! matching the teacher's layering of `thiserror` library errors under an
//! `anyhow` binary entry point.

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ring(#[from] imgdht_ring::RingError),

    #[error(transparent)]
    Wire(#[from] imgdht_wire::WireError),

    #[error("unrecognized message type byte {0:#04x}")]
    UnknownMessageType(u8),

    #[error("re-ID was triggered with no known peer to rejoin through")]
    ReidWithoutKnownPeer,

    /// Protocol violation, assertion-class (spec §7): wrong version byte, an
    /// out-of-band REDRT, or a JOIN received before this node is integrated
    /// into the ring. Never retried or logged-and-continued; `run()` aborts.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

pub type Result<T> = std::result::Result<T, NodeError>;
