//! Wire representation settings
//!
//! Two axes are fixed for the lifetime of one coding session: the byte order of
//! every multi-byte integer, and whether counts and referent ids are 32 or 64
//! bits wide (NDR vs NDR64 transfer syntax). Neither is negotiated here; the
//! bind layer picks them and hands the result to [`crate::Pdu`].

use crate::handles::Uuid;
use crate::pdu::{NdrCoder, Pdu};
use crate::Result;

/// Byte order of multi-byte integers on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order announced by a DCE RPC data representation label
    ///
    /// Only the high nibble of the first byte carries the integer
    /// representation: `0x1` is little-endian, `0x0` big-endian.
    pub fn from_data_representation(drep: [u8; 4]) -> Self {
        if drep[0] & 0xf0 == 0x10 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Data representation label for this byte order, ASCII characters and
    /// IEEE floating point
    pub fn data_representation(self) -> [u8; 4] {
        match self {
            ByteOrder::Little => [0x10, 0x00, 0x00, 0x00],
            ByteOrder::Big => [0x00, 0x00, 0x00, 0x00],
        }
    }
}

/// Size representation of counts and referent ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Representation {
    /// NDR 2.0: 4-byte counts and referent ids
    #[default]
    Ndr32,
    /// NDR64: 8-byte counts and referent ids
    Ndr64,
}

/// Transfer syntax identifier offered in a bind for a representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferSyntax {
    pub uuid: Uuid,
    pub version: u32,
}

impl NdrCoder for TransferSyntax {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        self.uuid.code_fields(pdu)?;
        pdu.uint32(&mut self.version)
    }
}

const NDR32_SYNTAX: TransferSyntax = TransferSyntax {
    uuid: Uuid::from_fields(
        0x8a88_5d04,
        0x1ceb,
        0x11c9,
        [0x9f, 0xe8, 0x08, 0x00, 0x2b, 0x10, 0x48, 0x60],
    ),
    version: 2,
};

const NDR64_SYNTAX: TransferSyntax = TransferSyntax {
    uuid: Uuid::from_fields(
        0x7171_0533,
        0xbeba,
        0x4937,
        [0x83, 0x19, 0xb5, 0xdb, 0xef, 0x9c, 0xcc, 0x36],
    ),
    version: 1,
};

impl Representation {
    /// Width in bytes of counts and referent ids
    #[inline]
    pub fn width(self) -> usize {
        match self {
            Representation::Ndr32 => 4,
            Representation::Ndr64 => 8,
        }
    }

    pub fn transfer_syntax(self) -> TransferSyntax {
        match self {
            Representation::Ndr32 => NDR32_SYNTAX,
            Representation::Ndr64 => NDR64_SYNTAX,
        }
    }

    /// Representation for a presentation context id as the SMB2 client binds
    /// them: context 0 carries NDR, context 1 carries NDR64.
    pub fn from_transfer_context(context_id: u16) -> Option<Self> {
        match context_id {
            0 => Some(Representation::Ndr32),
            1 => Some(Representation::Ndr64),
            _ => None,
        }
    }
}

/// Default ceiling on full pointer nesting accepted while decoding
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Per-session wire configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    pub representation: Representation,
    pub byte_order: ByteOrder,
    /// Maximum nesting of full-pointer targets accepted while decoding
    pub max_depth: usize,
}

impl WireConfig {
    pub fn new(representation: Representation, byte_order: ByteOrder) -> Self {
        Self {
            representation,
            byte_order,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// NDR, little-endian
    pub fn ndr32() -> Self {
        Self::new(Representation::Ndr32, ByteOrder::Little)
    }

    /// NDR64, little-endian
    pub fn ndr64() -> Self {
        Self::new(Representation::Ndr64, ByteOrder::Little)
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self::ndr32()
    }
}
