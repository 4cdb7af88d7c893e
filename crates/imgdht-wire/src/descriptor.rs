//! The 8-byte node descriptor: `{rsvd:1, id:1, port:2, ipv4:4}` (spec §6).

use crate::{Result, WireError};
use imgdht_ring::fingers::NodeDescriptor;
use imgdht_ring::id::Id;
use std::net::Ipv4Addr;

/// Wire size of a node descriptor, in bytes.
pub const LEN: usize = 8;

/// Encode a [`NodeDescriptor`] into its 8-byte wire form.
pub fn encode(d: &NodeDescriptor) -> [u8; LEN] {
    let mut buf = [0u8; LEN];
    buf[0] = 0; // rsvd
    buf[1] = d.id.value();
    buf[2..4].copy_from_slice(&d.port.to_be_bytes());
    buf[4..8].copy_from_slice(&d.addr.octets());
    buf
}

/// Decode an 8-byte node descriptor from the front of `buf`.
pub fn decode(buf: &[u8]) -> Result<NodeDescriptor> {
    if buf.len() < LEN {
        return Err(WireError::ShortRead {
            need: LEN,
            got: buf.len(),
        });
    }
    let id = Id(buf[1]);
    let port = u16::from_be_bytes([buf[2], buf[3]]);
    let addr = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
    Ok(NodeDescriptor { id, addr, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let d = NodeDescriptor {
            id: Id(200),
            addr: Ipv4Addr::new(10, 0, 0, 1),
            port: 4433,
        };
        let bytes = encode(&d);
        let back = decode(&bytes).expect("decode");
        assert_eq!(back, d);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(decode(&[0u8; 4]).is_err());
    }
}
