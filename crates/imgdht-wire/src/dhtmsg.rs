//! `DHTMSG`: the common 4-byte header plus a trailing node descriptor
//! (spec §3, §6). 12 bytes on the wire.

use crate::types::{TypeFlags, PROTOCOL_VERSION};
use crate::{descriptor, Result, WireError};
use imgdht_ring::fingers::NodeDescriptor;

/// Wire size of a `DHTMSG`.
pub const LEN: usize = 4 + descriptor::LEN;

/// `DHTMSG`: `{version, type, ttl-high, ttl-low, node descriptor}`.
#[derive(Copy, Clone, Debug)]
pub struct DhtMsg {
    pub version: u8,
    pub msg_type: TypeFlags,
    pub ttl: u16,
    pub node: NodeDescriptor,
}

impl DhtMsg {
    /// Build a message with the current protocol version.
    pub fn new(msg_type: TypeFlags, ttl: u16, node: NodeDescriptor) -> Self {
        DhtMsg {
            version: PROTOCOL_VERSION,
            msg_type,
            ttl,
            node,
        }
    }

    pub fn to_bytes(&self) -> [u8; LEN] {
        let mut buf = [0u8; LEN];
        buf[0] = self.version;
        buf[1] = self.msg_type.bits();
        buf[2..4].copy_from_slice(&self.ttl.to_be_bytes());
        buf[4..].copy_from_slice(&descriptor::encode(&self.node));
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < LEN {
            return Err(WireError::ShortRead {
                need: LEN,
                got: buf.len(),
            });
        }
        let version = buf[0];
        if version != PROTOCOL_VERSION {
            return Err(WireError::BadVersion {
                got: version,
                expected: PROTOCOL_VERSION,
            });
        }
        let msg_type = TypeFlags::from_bits_retain(buf[1]);
        let ttl = u16::from_be_bytes([buf[2], buf[3]]);
        let node = descriptor::decode(&buf[4..])?;
        Ok(DhtMsg {
            version,
            msg_type,
            ttl,
            node,
        })
    }

    /// Decrement TTL on a fresh copy of this message (spec §4.3.4,
    /// §9 open question: the original mutates the caller's buffer
    /// in-place, double-decrementing TTL across a REDRT retry; this
    /// reimplementation always decrements a local copy per hop).
    ///
    /// Returns `None` once TTL has reached zero (drop silently).
    pub fn decremented(&self) -> Option<Self> {
        let ttl = self.ttl.checked_sub(1)?;
        if ttl == 0 {
            return None;
        }
        Some(DhtMsg { ttl, ..*self })
    }
}
