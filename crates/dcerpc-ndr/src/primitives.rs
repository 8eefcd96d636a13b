//! NDR primitive coders
//!
//! | IDL type        | Rust type | Size | Alignment |
//! |-----------------|-----------|------|-----------|
//! | small / byte    | i8 / u8   | 1    | 1         |
//! | short / wchar_t | i16 / u16 | 2    | 2         |
//! | long            | i32 / u32 | 4    | 4         |
//! | hyper           | i64 / u64 | 8    | 8         |
//! | size / referent | u64       | 4, 8 | 4, 8      |
//!
//! The last row follows the session representation: 4 bytes under NDR and
//! 8 bytes under NDR64.

use bytes::{Buf, BufMut};

use crate::config::{ByteOrder, Representation};
use crate::pdu::{Direction, NdrCoder, Pdu};
use crate::{NdrError, Result};

// Each primitive aligns to its own width, then moves that many bytes in the
// session byte order. One method per width serves both directions.
macro_rules! impl_ndr_primitive {
    ($ty:ty, $method:ident, $size:expr, $put_le:ident, $put_be:ident, $get_le:ident, $get_be:ident) => {
        impl<'b, 'v> Pdu<'b, 'v> {
            #[doc = concat!("Code a `", stringify!($ty), "`")]
            pub fn $method(&mut self, value: &mut $ty) -> Result<()> {
                self.cursor.align($size)?;
                let order = self.config.byte_order;
                match self.direction {
                    Direction::Encode => {
                        let mut dst = self.cursor.put_bytes($size)?;
                        match order {
                            ByteOrder::Little => dst.$put_le(*value),
                            ByteOrder::Big => dst.$put_be(*value),
                        }
                    }
                    Direction::Decode => {
                        let mut src = self.cursor.get_bytes($size)?;
                        *value = match order {
                            ByteOrder::Little => src.$get_le(),
                            ByteOrder::Big => src.$get_be(),
                        };
                    }
                }
                Ok(())
            }
        }

        impl NdrCoder for $ty {
            fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
                pdu.$method(self)
            }
        }
    };
}

impl_ndr_primitive!(u8, uint8, 1, put_u8, put_u8, get_u8, get_u8);
impl_ndr_primitive!(i8, int8, 1, put_i8, put_i8, get_i8, get_i8);
impl_ndr_primitive!(u16, uint16, 2, put_u16_le, put_u16, get_u16_le, get_u16);
impl_ndr_primitive!(i16, int16, 2, put_i16_le, put_i16, get_i16_le, get_i16);
impl_ndr_primitive!(u32, uint32, 4, put_u32_le, put_u32, get_u32_le, get_u32);
impl_ndr_primitive!(i32, int32, 4, put_i32_le, put_i32, get_i32_le, get_i32);
impl_ndr_primitive!(u64, uint64, 8, put_u64_le, put_u64, get_u64_le, get_u64);
impl_ndr_primitive!(i64, int64, 8, put_i64_le, put_i64, get_i64_le, get_i64);

impl<'b, 'v> Pdu<'b, 'v> {
    /// Code a count or referent id in the session's size representation
    pub fn uint3264(&mut self, value: &mut u64) -> Result<()> {
        self.cursor.align(self.config.representation.width())?;
        match self.config.representation {
            Representation::Ndr64 => self.uint64(value),
            Representation::Ndr32 => {
                let mut narrow = match self.direction {
                    Direction::Encode => {
                        u32::try_from(*value).map_err(|_| NdrError::InvalidLength {
                            offset: self.cursor.offset(),
                            count: *value,
                            reason: "count does not fit the 32-bit representation",
                        })?
                    }
                    Direction::Decode => 0,
                };
                self.uint32(&mut narrow)?;
                *value = u64::from(narrow);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WireConfig;

    fn encode_with<F>(config: WireConfig, f: F) -> Vec<u8>
    where
        F: FnOnce(&mut Pdu<'_, '_>),
    {
        let mut buf = [0xffu8; 64];
        let mut pdu = Pdu::encoder(&mut buf, config);
        f(&mut pdu);
        let len = pdu.finish().unwrap();
        buf[..len].to_vec()
    }

    #[test]
    fn test_primitive_layout_le() {
        let bytes = encode_with(WireConfig::ndr32(), |pdu| {
            pdu.uint8(&mut 0x11).unwrap();
            pdu.uint16(&mut 0x2233).unwrap();
            pdu.int32(&mut -2).unwrap();
            pdu.uint64(&mut 0x0102_0304_0506_0708).unwrap();
        });
        assert_eq!(
            bytes,
            vec![
                0x11, 0x00, 0x33, 0x22, // u8, pad, u16
                0xfe, 0xff, 0xff, 0xff, // i32
                0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // u64
            ]
        );
    }

    #[test]
    fn test_primitive_layout_be() {
        let config = WireConfig::ndr32().with_byte_order(ByteOrder::Big);
        let bytes = encode_with(config, |pdu| {
            pdu.uint16(&mut 0x2233).unwrap();
            pdu.uint32(&mut 0x8000_0003).unwrap();
        });
        assert_eq!(bytes, vec![0x22, 0x33, 0x00, 0x00, 0x80, 0x00, 0x00, 0x03]);
    }

    #[test]
    fn test_primitive_roundtrip() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let config = WireConfig::ndr32().with_byte_order(order);
            let bytes = encode_with(config, |pdu| {
                pdu.int8(&mut -5).unwrap();
                pdu.int16(&mut -1234).unwrap();
                pdu.uint32(&mut 0xdead_beef).unwrap();
                pdu.int64(&mut i64::MIN).unwrap();
            });

            let mut pdu = Pdu::decoder(&bytes, config);
            let (mut a, mut b, mut c, mut d) = (0i8, 0i16, 0u32, 0i64);
            pdu.int8(&mut a).unwrap();
            pdu.int16(&mut b).unwrap();
            pdu.uint32(&mut c).unwrap();
            pdu.int64(&mut d).unwrap();
            assert_eq!((a, b, c, d), (-5, -1234, 0xdead_beef, i64::MIN));
            assert_eq!(pdu.finish().unwrap(), bytes.len());
        }
    }

    #[test]
    fn test_uint3264_width() {
        let bytes = encode_with(WireConfig::ndr32(), |pdu| {
            pdu.uint8(&mut 1).unwrap();
            pdu.uint3264(&mut 10).unwrap();
        });
        assert_eq!(bytes, vec![1, 0, 0, 0, 10, 0, 0, 0]);

        let bytes = encode_with(WireConfig::ndr64(), |pdu| {
            pdu.uint8(&mut 1).unwrap();
            pdu.uint3264(&mut 10).unwrap();
        });
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..], &[10, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_uint3264_rejects_wide_count_in_ndr32() {
        let mut buf = [0u8; 8];
        let mut pdu = Pdu::encoder(&mut buf, WireConfig::ndr32());
        pdu.uint8(&mut 1).unwrap();
        let err = pdu.uint3264(&mut (u64::from(u32::MAX) + 1)).unwrap_err();
        // Reported at the aligned counter, not at the padding
        assert!(matches!(err, NdrError::InvalidLength { offset: 4, .. }));
    }
}
