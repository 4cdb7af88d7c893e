//! # imgdht-wire
//!
//! The imgdht wire protocol (spec §3, §6): fixed-layout binary messages in
//! network byte order, mirroring `dhtn.h`'s `dhtmsg_t`/`dhtsrch_t` structs
//! exactly.
//!
//! Grounded on the teacher's `ochra-transport::wire` envelope for the
//! overall shape (a `version`-checked envelope with `to_bytes`/`from_bytes`
//! and a `validate()` step) but using a fixed binary layout instead of CBOR:
//! spec §6 fixes the exact byte layout, which is a WHAT, not a HOW choice.

pub mod descriptor;
pub mod dhtmsg;
pub mod dhtsrch;
pub mod image_meta;
pub mod types;

/// Errors decoding or validating wire messages.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes were supplied than the fixed-size message requires.
    #[error("short read: need {need} bytes, got {got}")]
    ShortRead { need: usize, got: usize },

    /// The version byte did not match [`types::PROTOCOL_VERSION`].
    #[error("unsupported protocol version {got}, expected {expected}")]
    BadVersion { got: u8, expected: u8 },

    /// The name field contained bytes that are not valid UTF-8 up to the
    /// first NUL terminator.
    #[error("name field is not valid UTF-8")]
    InvalidName,

    /// A name was too long to fit in the fixed-length wire field.
    #[error("name {len} bytes exceeds the {max}-byte wire field")]
    NameTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
