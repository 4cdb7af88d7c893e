//! Message type flags and the closed set of message kinds (spec §3, §9
//! design notes: "the eight message types form a closed set and should be
//! modeled as a tagged variant ... not runtime subtype dispatch").

use bitflags::bitflags;

/// The protocol version byte every message starts with (spec §6, §7:
/// "wrong version byte" is a protocol-violation, fatal error). The
/// original `netimg.h` constant was not part of the retrieved source; `2`
/// is this implementation's chosen value (see DESIGN.md).
pub const PROTOCOL_VERSION: u8 = 2;

bitflags! {
    /// The raw type byte. `MISS` (`0x22`) deliberately aliases
    /// `REPLY (0x20) | REID (0x02)`'s bits (spec §9 open question); callers
    /// must check [`TypeFlags::is_exactly_miss`] (or otherwise compare for
    /// exact equality) before testing any other flag with
    /// [`TypeFlags::contains`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct TypeFlags: u8 {
        const JOIN  = 0x01;
        const REID  = 0x02;
        const WLCM  = 0x04;
        const FIND  = 0x08;
        const QUERY = 0x10;
        const REPLY = 0x20;
        const MISS  = 0x22;
        const REDRT = 0x40;
        const ATLOC = 0x80;
    }
}

impl TypeFlags {
    /// True iff this is the `MISS` sentinel (checked by exact equality,
    /// never by bitmask, per spec §9).
    pub fn is_exactly_miss(self) -> bool {
        self == TypeFlags::MISS
    }

    /// The type with `ATLOC` stripped, for matching against JOIN/QUERY/etc.
    pub fn without_atloc(self) -> TypeFlags {
        self & !TypeFlags::ATLOC
    }

    /// True iff the sender expects the recipient to be the owner (spec §3
    /// "ATLOC").
    pub fn at_location(self) -> bool {
        self.contains(TypeFlags::ATLOC)
    }
}

/// The closed set of message kinds a node handler dispatches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Join,
    Reid,
    Wlcm,
    Find,
    Query,
    Reply,
    Miss,
    Redrt,
}

impl MessageKind {
    /// Classify a raw type byte. MISS is checked first and by exact
    /// equality so it is never mistaken for REPLY or REID (spec §9).
    pub fn classify(flags: TypeFlags) -> Option<MessageKind> {
        if flags.is_exactly_miss() {
            return Some(MessageKind::Miss);
        }
        match flags.without_atloc() {
            TypeFlags::JOIN => Some(MessageKind::Join),
            TypeFlags::REID => Some(MessageKind::Reid),
            TypeFlags::WLCM => Some(MessageKind::Wlcm),
            TypeFlags::FIND => Some(MessageKind::Find),
            TypeFlags::QUERY => Some(MessageKind::Query),
            TypeFlags::REPLY => Some(MessageKind::Reply),
            TypeFlags::REDRT => Some(MessageKind::Redrt),
            _ => None,
        }
    }
}
