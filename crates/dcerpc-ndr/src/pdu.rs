//! Coding session
//!
//! A [`Pdu`] binds one direction, one [`WireConfig`], a borrowed buffer and
//! the pointer bookkeeping for a single encode or decode. Structured types
//! implement [`NdrCoder`] once; the same routine runs in both directions, so
//! the field order on the wire cannot drift between encoder and decoder.
//!
//! ```text
//! caller ── Pdu::encoder / Pdu::decoder
//!             └── pdu.reference(&mut value)   top-level [ref], no referent
//!                   └── value.code(pdu)       fixed part, pointers deferred
//!                   └── drain                 pointee bodies, FIFO per scope
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::config::{ByteOrder, Representation, WireConfig};
use crate::cursor::ByteCursor;
use crate::pointers::{Deferred, ReferentTable, SharedBody};
use crate::Result;

/// Whether a session turns values into bytes or bytes into values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Encode,
    Decode,
}

/// A type that knows its own NDR layout
///
/// `code` lists the fields in wire order and hands each one to the matching
/// [`Pdu`] method. On encode the fields are read; on decode they are
/// overwritten. Pointer fields are borrowed for `'v` because their bodies are
/// coded later, after the enclosing fixed part.
pub trait NdrCoder {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()>;
}

/// One encode or decode session
pub struct Pdu<'b, 'v> {
    pub(crate) direction: Direction,
    pub(crate) config: WireConfig,
    pub(crate) cursor: ByteCursor<'b>,
    pub(crate) referents: ReferentTable,
    pub(crate) deferred: VecDeque<Deferred<'v>>,
    /// Full pointer targets reached inside a shared session, coded by the
    /// enclosing session once the current target is released
    pub(crate) postponed: Vec<SharedBody>,
    /// Full pointer targets enclosing this session; zero outside any
    pub(crate) depth: usize,
    /// No enclosing coder is running
    pub(crate) top_level: bool,
}

impl<'b, 'v> Pdu<'b, 'v> {
    /// Session that encodes into `buf`
    pub fn encoder(buf: &'b mut [u8], config: WireConfig) -> Self {
        Self::with_cursor(Direction::Encode, ByteCursor::output(buf), config)
    }

    /// Session that decodes from `buf`
    pub fn decoder(buf: &'b [u8], config: WireConfig) -> Self {
        Self::with_cursor(Direction::Decode, ByteCursor::input(buf), config)
    }

    fn with_cursor(direction: Direction, cursor: ByteCursor<'b>, config: WireConfig) -> Self {
        Self {
            direction,
            config,
            cursor,
            referents: ReferentTable::default(),
            deferred: VecDeque::new(),
            postponed: Vec::new(),
            depth: 0,
            top_level: true,
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn is_encoding(&self) -> bool {
        self.direction == Direction::Encode
    }

    #[inline]
    pub fn is_decoding(&self) -> bool {
        self.direction == Direction::Decode
    }

    #[inline]
    pub fn config(&self) -> WireConfig {
        self.config
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        self.config.representation
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.config.byte_order
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Bytes left between the offset and the end of the buffer
    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Align the offset to `alignment` (a power of two)
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        self.cursor.align(alignment)
    }

    /// End the session and return the final offset
    pub fn finish(self) -> Result<usize> {
        let offset = self.cursor.offset();
        debug!(
            direction = ?self.direction,
            representation = ?self.config.representation,
            byte_order = ?self.config.byte_order,
            offset,
            "NDR session finished"
        );
        Ok(offset)
    }
}

/// Encode `value` as a top-level reference parameter
///
/// Encoding takes `&mut` because coders are shared with the decoder; the
/// value is not modified. Returns the number of bytes written.
pub fn encode<T: NdrCoder>(value: &mut T, buf: &mut [u8], config: WireConfig) -> Result<usize> {
    let mut pdu = Pdu::encoder(buf, config);
    pdu.reference(value)?;
    pdu.finish()
}

/// Decode a top-level reference parameter, returning it with the final offset
pub fn decode<T: NdrCoder + Default>(buf: &[u8], config: WireConfig) -> Result<(T, usize)> {
    let mut value = T::default();
    let offset = {
        let mut pdu = Pdu::decoder(buf, config);
        pdu.reference(&mut value)?;
        pdu.finish()?
    };
    Ok((value, offset))
}
