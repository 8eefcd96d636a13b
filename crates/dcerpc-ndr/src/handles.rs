//! UUIDs and context handles
//!
//! A UUID travels as the structure `{ u32, u16, u16, u8[8] }`, so its first
//! three fields follow the session byte order while the last eight bytes do
//! not. A context handle (for example the policy handle returned by an LSA
//! open) is a `u32` attribute word followed by a UUID: 20 bytes that the
//! client echoes back verbatim.

use std::fmt;

use crate::pdu::{NdrCoder, Pdu};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Uuid {
    pub const NIL: Uuid = Uuid::from_fields(0, 0, 0, [0; 8]);

    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Code the four fields with a short-lived borrow
    pub fn code_fields(&mut self, pdu: &mut Pdu<'_, '_>) -> Result<()> {
        pdu.uint32(&mut self.data1)?;
        pdu.uint16(&mut self.data2)?;
        pdu.uint16(&mut self.data3)?;
        for byte in &mut self.data4 {
            pdu.uint8(byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl NdrCoder for Uuid {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        self.code_fields(pdu)
    }
}

/// Opaque server-side handle, e.g. an LSA or SAMR policy handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextHandle {
    pub attributes: u32,
    pub uuid: Uuid,
}

impl ContextHandle {
    /// A handle the server has closed, or one never opened
    pub fn is_null(&self) -> bool {
        self.attributes == 0 && self.uuid.is_nil()
    }
}

impl NdrCoder for ContextHandle {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        pdu.uint32(&mut self.attributes)?;
        self.uuid.code_fields(pdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ByteOrder, Representation, WireConfig};
    use crate::pdu::{decode, encode};

    #[test]
    fn test_uuid_display() {
        let syntax = Representation::Ndr32.transfer_syntax();
        assert_eq!(syntax.uuid.to_string(), "8a885d04-1ceb-11c9-9fe8-08002b104860");
        assert!(Uuid::NIL.is_nil());
    }

    #[test]
    fn test_uuid_byte_order() {
        let mut uuid = Representation::Ndr64.transfer_syntax().uuid;
        let mut buf = [0u8; 16];

        encode(&mut uuid, &mut buf, WireConfig::ndr32()).unwrap();
        assert_eq!(
            buf,
            [
                0x33, 0x05, 0x71, 0x71, 0xba, 0xbe, 0x37, 0x49, 0x83, 0x19, 0xb5, 0xdb, 0xef,
                0x9c, 0xcc, 0x36
            ]
        );

        let config = WireConfig::ndr32().with_byte_order(ByteOrder::Big);
        encode(&mut uuid, &mut buf, config).unwrap();
        assert_eq!(&buf[..8], &[0x71, 0x71, 0x05, 0x33, 0xbe, 0xba, 0x49, 0x37]);
        let (decoded, _) = decode::<Uuid>(&buf, config).unwrap();
        assert_eq!(decoded, uuid);
    }

    #[test]
    fn test_policy_handle_roundtrip() {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(b"ij012345");
        let mut handle = ContextHandle {
            attributes: 0,
            uuid: Uuid::from_fields(
                u32::from_le_bytes(*b"abcd"),
                u16::from_le_bytes(*b"ef"),
                u16::from_le_bytes(*b"gh"),
                data4,
            ),
        };
        assert!(!handle.is_null());

        let mut buf = [0u8; 32];
        let len = encode(&mut handle, &mut buf, WireConfig::ndr32()).unwrap();
        assert_eq!(len, 20);
        assert_eq!(&buf[4..20], b"abcdefghij012345");

        let (decoded, _) = decode::<ContextHandle>(&buf[..len], WireConfig::ndr32()).unwrap();
        assert_eq!(decoded, handle);
        assert!(ContextHandle::default().is_null());
    }
}
