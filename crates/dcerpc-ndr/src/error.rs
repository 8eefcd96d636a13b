//! NDR error types

use thiserror::Error;

/// NDR encoding/decoding errors
///
/// Every variant records the byte offset into the stub buffer where coding
/// stopped, so a caller can tell which field of which structure was bad.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NdrError {
    /// Encoding would write past the end of the output buffer
    #[error("out of space at offset {offset}: needed {needed} bytes, capacity {capacity}")]
    OutOfSpace {
        offset: usize,
        needed: usize,
        capacity: usize,
    },

    /// Decoding needs more bytes than remain in the input buffer
    #[error("truncated at offset {offset}: needed {needed} bytes, have {remaining}")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A decoded count is structurally invalid
    #[error("invalid length {count} at offset {offset}: {reason}")]
    InvalidLength {
        offset: usize,
        count: u64,
        reason: &'static str,
    },

    /// The input needs array transfer semantics this engine does not implement
    #[error("unsupported feature at offset {offset}: {feature}")]
    UnsupportedFeature { offset: usize, feature: &'static str },

    /// A referent was announced but its body could not be read
    #[error("dangling referent 0x{referent:x} at offset {offset}")]
    DanglingReferent { offset: usize, referent: u64 },

    /// The same referent id was decoded for incompatible targets
    #[error("referent 0x{referent:x} conflicts with an earlier target at offset {offset}")]
    ReferentConflict { offset: usize, referent: u64 },

    /// Decoded code units are not valid UTF-16
    #[error("invalid UTF-16 string at offset {offset}")]
    InvalidUtf16 { offset: usize },

    /// Shared pointer targets nest deeper than the configured limit
    #[error("pointer nesting exceeds {limit} at offset {offset}")]
    NestingTooDeep { offset: usize, limit: usize },
}

impl NdrError {
    /// Byte offset at which the failure occurred
    pub fn offset(&self) -> usize {
        match *self {
            NdrError::OutOfSpace { offset, .. }
            | NdrError::Truncated { offset, .. }
            | NdrError::InvalidLength { offset, .. }
            | NdrError::UnsupportedFeature { offset, .. }
            | NdrError::DanglingReferent { offset, .. }
            | NdrError::ReferentConflict { offset, .. }
            | NdrError::InvalidUtf16 { offset }
            | NdrError::NestingTooDeep { offset, .. } => offset,
        }
    }
}

/// Result type for NDR operations
pub type Result<T> = std::result::Result<T, NdrError>;
