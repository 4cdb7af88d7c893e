//! `DHTSRCH`: a [`DhtMsg`](crate::dhtmsg::DhtMsg) plus an object id byte and
//! a fixed-length NUL-padded name field (spec §3, §6). 269 bytes on the wire.

use crate::dhtmsg::{self, DhtMsg};
use crate::{Result, WireError};

/// Wire width of the fixed-length name field.
pub const NAME_LEN: usize = 256;

/// Wire size of a `DHTSRCH`.
pub const LEN: usize = dhtmsg::LEN + 1 + NAME_LEN;

/// `DHTSRCH`: a query/reply envelope naming a single object.
#[derive(Clone, Debug)]
pub struct DhtSrch {
    pub header: DhtMsg,
    pub img_id: u8,
    pub name: String,
}

impl DhtSrch {
    pub fn new(header: DhtMsg, img_id: u8, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() >= NAME_LEN {
            return Err(WireError::NameTooLong {
                len: name.len(),
                max: NAME_LEN - 1,
            });
        }
        Ok(DhtSrch {
            header,
            img_id,
            name,
        })
    }

    pub fn to_bytes(&self) -> [u8; LEN] {
        let mut buf = [0u8; LEN];
        buf[..dhtmsg::LEN].copy_from_slice(&self.header.to_bytes());
        buf[dhtmsg::LEN] = self.img_id;
        let name_bytes = self.name.as_bytes();
        let start = dhtmsg::LEN + 1;
        buf[start..start + name_bytes.len()].copy_from_slice(name_bytes);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < LEN {
            return Err(WireError::ShortRead {
                need: LEN,
                got: buf.len(),
            });
        }
        let header = DhtMsg::from_bytes(&buf[..dhtmsg::LEN])?;
        let img_id = buf[dhtmsg::LEN];
        let name_start = dhtmsg::LEN + 1;
        let name_field = &buf[name_start..name_start + NAME_LEN];
        let nul = name_field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name = std::str::from_utf8(&name_field[..nul])
            .map_err(|_| WireError::InvalidName)?
            .to_owned();
        Ok(DhtSrch {
            header,
            img_id,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeFlags;
    use imgdht_ring::fingers::NodeDescriptor;
    use imgdht_ring::id::Id;
    use std::net::Ipv4Addr;

    fn header() -> DhtMsg {
        DhtMsg::new(
            TypeFlags::QUERY,
            16,
            NodeDescriptor {
                id: Id(7),
                addr: Ipv4Addr::new(192, 168, 0, 1),
                port: 9999,
            },
        )
    }

    #[test]
    fn roundtrip_preserves_name() {
        let msg = DhtSrch::new(header(), 5, "sunset.tga").expect("new");
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), LEN);
        let back = DhtSrch::from_bytes(&bytes).expect("decode");
        assert_eq!(back.name, "sunset.tga");
        assert_eq!(back.img_id, 5);
    }

    #[test]
    fn name_at_the_wire_limit_is_rejected() {
        let long = "a".repeat(NAME_LEN);
        assert!(matches!(
            DhtSrch::new(header(), 0, long),
            Err(WireError::NameTooLong { .. })
        ));
    }

    #[test]
    fn trailing_bytes_past_the_nul_are_ignored() {
        let msg = DhtSrch::new(header(), 0, "a").expect("new");
        let mut bytes = msg.to_bytes();
        // Garbage left over from a previous, longer name in the same buffer.
        let tail = dhtmsg::LEN + 1 + 2;
        bytes[tail] = b'x';
        let back = DhtSrch::from_bytes(&bytes).expect("decode");
        assert_eq!(back.name, "a");
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(matches!(
            DhtSrch::from_bytes(&[0u8; 10]),
            Err(WireError::ShortRead { .. })
        ));
    }
}
