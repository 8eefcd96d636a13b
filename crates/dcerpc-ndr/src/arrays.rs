//! NDR array headers and conformant arrays
//!
//! Conformant arrays carry their element count (`max_count`) in front of the
//! elements; varying arrays add `offset` and `actual_count`. Every counter is
//! 4 bytes under NDR and 8 bytes under NDR64.

use tracing::debug;

use crate::pdu::{NdrCoder, Pdu};
use crate::{NdrError, Result};

/// Header of a conformant varying array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaryingHeader {
    pub max_count: u64,
    pub offset: u64,
    pub actual_count: u64,
}

impl VaryingHeader {
    /// Header for a whole array of `count` elements
    pub fn whole(count: u64) -> Self {
        Self {
            max_count: count,
            offset: 0,
            actual_count: count,
        }
    }

    /// Code the three counters; the header owns no pointers, so a
    /// short-lived borrow is enough.
    pub fn code_counts(&mut self, pdu: &mut Pdu<'_, '_>) -> Result<()> {
        pdu.uint3264(&mut self.max_count)?;
        pdu.uint3264(&mut self.offset)?;
        pdu.uint3264(&mut self.actual_count)
    }
}

impl NdrCoder for VaryingHeader {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        self.code_counts(pdu)
    }
}

/// Conformant array - size determined at runtime
///
/// Wire format:
/// ```text
/// max_count: u32 | u64  # number of elements
/// elements[max_count]
/// pointees of the elements, in element order
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConformantArray<T> {
    pub elements: Vec<T>,
}

impl<T> ConformantArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> From<Vec<T>> for ConformantArray<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements }
    }
}

impl<T: NdrCoder + Default> NdrCoder for ConformantArray<T> {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        pdu.align(pdu.representation().width())?;
        let offset = pdu.offset();
        let mut max_count = self.elements.len() as u64;
        pdu.uint3264(&mut max_count)?;

        if pdu.is_decoding() {
            // Every element takes at least one byte, so the rest of the buffer
            // bounds the count before anything is allocated.
            let count = usize::try_from(max_count)
                .ok()
                .filter(|count| *count <= pdu.remaining())
                .ok_or_else(|| {
                    debug!(offset, max_count, "rejecting conformant array");
                    NdrError::InvalidLength {
                        offset,
                        count: max_count,
                        reason: "array count exceeds remaining buffer",
                    }
                })?;
            self.elements.clear();
            self.elements.resize_with(count, T::default);
        }

        for element in &mut self.elements {
            element.code(pdu)?;
        }
        Ok(())
    }
}
