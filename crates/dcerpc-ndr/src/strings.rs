//! NDR string types
//!
//! A `[string] wchar_t *` is a conformant varying array of UTF-16 code units
//! that includes its terminating null.
//!
//! Wire format:
//! ```text
//! max_count: u32 | u64     # code units including null
//! offset: u32 | u64        # always 0
//! actual_count: u32 | u64  # code units including null
//! units[actual_count]      # each u16 in session byte order
//! ```

use tracing::debug;

use crate::arrays::VaryingHeader;
use crate::pdu::{NdrCoder, Pdu};
use crate::{NdrError, Result};

/// Null-terminated UTF-16 string
///
/// Holds the text together with its wire form (code units including the
/// terminating null). Both are set together: by the constructors on the way
/// in and by the decoder on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utf16String {
    text: String,
    wide: Vec<u16>,
}

impl Utf16String {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let wide = text.encode_utf16().chain(std::iter::once(0)).collect();
        Self { text, wide }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Code units including the terminating null
    pub fn wide(&self) -> &[u16] {
        &self.wide
    }

    /// Check a decoded header and return the code unit count it announces
    fn validate(header: &VaryingHeader, offset: usize, remaining: usize) -> Result<usize> {
        let invalid = |reason| NdrError::InvalidLength {
            offset,
            count: header.actual_count,
            reason,
        };
        if header.actual_count == 0 {
            return Err(invalid("zero actual count"));
        }
        if header.actual_count > header.max_count {
            return Err(invalid("actual count exceeds max count"));
        }
        if header.offset != 0 {
            return Err(NdrError::UnsupportedFeature {
                offset,
                feature: "varying array with non-zero offset",
            });
        }
        usize::try_from(header.actual_count)
            .ok()
            .filter(|count| count.checked_mul(2).is_some_and(|bytes| bytes <= remaining))
            .ok_or_else(|| invalid("actual count exceeds remaining buffer"))
    }
}

impl Default for Utf16String {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl From<&str> for Utf16String {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Utf16String {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Utf16String {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl NdrCoder for Utf16String {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        pdu.align(pdu.representation().width())?;
        let offset = pdu.offset();
        let mut header = VaryingHeader::whole(self.wide.len() as u64);
        header.code_counts(pdu)?;

        if pdu.is_decoding() {
            let count = Self::validate(&header, offset, pdu.remaining()).inspect_err(|err| {
                debug!(offset, ?header, %err, "rejecting string header");
            })?;
            self.wide = vec![0; count];
        }

        for unit in &mut self.wide {
            pdu.uint16(unit)?;
        }

        if pdu.is_decoding() {
            let Some((&0, units)) = self.wide.split_last() else {
                return Err(NdrError::InvalidLength {
                    offset,
                    count: header.actual_count,
                    reason: "string is not null terminated",
                });
            };
            self.text =
                String::from_utf16(units).map_err(|_| NdrError::InvalidUtf16 { offset })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ByteOrder, WireConfig};
    use crate::pdu::{decode, encode};

    #[test]
    fn test_wide_form_includes_null() {
        let s = Utf16String::new("IPC$");
        assert_eq!(s.wide(), &[0x49, 0x50, 0x43, 0x24, 0]);
        assert_eq!(Utf16String::default().wide(), &[0]);
    }

    #[test]
    fn test_utf16_roundtrip() {
        for config in [
            WireConfig::ndr32(),
            WireConfig::ndr32().with_byte_order(ByteOrder::Big),
            WireConfig::ndr64(),
        ] {
            let mut s = Utf16String::new("Hello, World!");
            let mut buf = [0u8; 128];
            let len = encode(&mut s, &mut buf, config).unwrap();
            let (decoded, offset) = decode::<Utf16String>(&buf[..len], config).unwrap();
            assert_eq!(offset, len);
            assert_eq!(decoded, s);
        }
    }

    #[test]
    fn test_utf16_surrogate_pairs() {
        let mut s = Utf16String::new("caf\u{e9} \u{1f980}");
        // The crab needs a surrogate pair
        assert_eq!(s.wide().len(), 8);

        let mut buf = [0u8; 64];
        let len = encode(&mut s, &mut buf, WireConfig::ndr32()).unwrap();
        assert_eq!(len, 12 + 16);
        let (decoded, _) = decode::<Utf16String>(&buf[..len], WireConfig::ndr32()).unwrap();
        assert_eq!(decoded.as_str(), "caf\u{e9} \u{1f980}");
    }

    #[test]
    fn test_empty_string() {
        let mut s = Utf16String::new("");
        let mut buf = [0u8; 32];
        let len = encode(&mut s, &mut buf, WireConfig::ndr32()).unwrap();
        // Still max_count=1, offset=0, actual_count=1 for the null terminator
        assert_eq!(&buf[..len], &[1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0]);

        let (decoded, _) = decode::<Utf16String>(&buf[..len], WireConfig::ndr32()).unwrap();
        assert_eq!(decoded.as_str(), "");
    }

    #[test]
    fn test_zero_actual_count() {
        let buf = [0u8; 16];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert_eq!(
            err,
            NdrError::InvalidLength {
                offset: 0,
                count: 0,
                reason: "zero actual count"
            }
        );
    }

    #[test]
    fn test_actual_count_beyond_buffer() {
        let buf = [
            0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x41, 0x00,
            0x00, 0x00,
        ];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert!(matches!(
            err,
            NdrError::InvalidLength {
                count: 0x4000_0000,
                reason: "actual count exceeds remaining buffer",
                ..
            }
        ));
    }

    #[test]
    fn test_actual_count_above_max_count() {
        let buf = [1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0x41, 0, 0, 0];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert!(matches!(
            err,
            NdrError::InvalidLength {
                reason: "actual count exceeds max count",
                ..
            }
        ));
    }

    #[test]
    fn test_nonzero_offset_is_unsupported() {
        let buf = [2, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert!(matches!(err, NdrError::UnsupportedFeature { offset: 0, .. }));
    }

    #[test]
    fn test_missing_null_terminator() {
        let buf = [2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0x41, 0, 0x42, 0];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert!(matches!(
            err,
            NdrError::InvalidLength {
                reason: "string is not null terminated",
                ..
            }
        ));
    }

    #[test]
    fn test_lone_surrogate() {
        let buf = [2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0x00, 0xd8, 0, 0];
        let err = decode::<Utf16String>(&buf, WireConfig::ndr32()).unwrap_err();
        assert_eq!(err, NdrError::InvalidUtf16 { offset: 0 });
    }

    #[derive(Debug, Default)]
    struct Tagged {
        tag: u16,
        name: Utf16String,
    }

    impl NdrCoder for Tagged {
        fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
            pdu.uint16(&mut self.tag)?;
            self.name.code(pdu)
        }
    }

    #[test]
    fn test_header_error_reports_aligned_offset() {
        let buf = [7, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = decode::<Tagged>(&buf, WireConfig::ndr32()).unwrap_err();
        assert_eq!(
            err,
            NdrError::InvalidLength {
                offset: 4,
                count: 0,
                reason: "zero actual count"
            }
        );

        let mut buf = [0u8; 64];
        let mut tagged = Tagged {
            tag: 7,
            name: "a".into(),
        };
        let len = encode(&mut tagged, &mut buf, WireConfig::ndr64()).unwrap();
        // u16, padding to 8, three 8-byte counters, two code units
        assert_eq!(len, 8 + 24 + 4);
        assert_eq!(&buf[2..8], &[0; 6]);
    }
}
