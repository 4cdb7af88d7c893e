//! A forwardable message: either a bare `DHTMSG` (JOIN/WLCM/REID/REDRT) or a
//! `DHTSRCH` (FIND/QUERY/REPLY/MISS), unified so `forward` (spec §4.3.4)
//! doesn't need to care which shape it's carrying.

use imgdht_ring::fingers::NodeDescriptor;
use imgdht_wire::dhtmsg::DhtMsg;
use imgdht_wire::dhtsrch::DhtSrch;
use imgdht_wire::types::TypeFlags;

#[derive(Clone, Debug)]
pub enum Payload {
    Msg(DhtMsg),
    Srch(DhtSrch),
}

impl Payload {
    pub fn msg_type(&self) -> TypeFlags {
        match self {
            Payload::Msg(m) => m.msg_type,
            Payload::Srch(s) => s.header.msg_type,
        }
    }

    pub fn node(&self) -> NodeDescriptor {
        match self {
            Payload::Msg(m) => m.node,
            Payload::Srch(s) => s.header.node,
        }
    }

    /// Decrement TTL once, on a fresh copy (spec §9 open question: never
    /// decrement the same logical hop twice across a REDRT retry).
    pub fn decremented(&self) -> Option<Payload> {
        match self {
            Payload::Msg(m) => m.decremented().map(Payload::Msg),
            Payload::Srch(s) => {
                let header = s.header.decremented()?;
                Some(Payload::Srch(DhtSrch {
                    header,
                    ..s.clone()
                }))
            }
        }
    }

    pub fn with_atloc(&self) -> Payload {
        match self {
            Payload::Msg(m) => {
                let mut m2 = *m;
                m2.msg_type |= TypeFlags::ATLOC;
                Payload::Msg(m2)
            }
            Payload::Srch(s) => {
                let mut s2 = s.clone();
                s2.header.msg_type |= TypeFlags::ATLOC;
                Payload::Srch(s2)
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Msg(m) => m.to_bytes().to_vec(),
            Payload::Srch(s) => s.to_bytes().to_vec(),
        }
    }
}
