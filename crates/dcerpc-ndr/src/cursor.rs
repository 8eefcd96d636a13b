//! Bounded byte cursor over caller-owned storage
//!
//! The cursor never grows its buffer. Encoding fails with
//! [`NdrError::OutOfSpace`] once the fixed capacity is exhausted and decoding
//! fails with [`NdrError::Truncated`] when fewer bytes remain than a field
//! needs. The offset only moves forward.

use crate::{NdrError, Result};

#[derive(Debug)]
enum Storage<'b> {
    Output(&'b mut [u8]),
    Input(&'b [u8]),
}

/// A borrowed view over a stub buffer plus the running offset
#[derive(Debug)]
pub struct ByteCursor<'b> {
    storage: Storage<'b>,
    offset: usize,
}

impl<'b> ByteCursor<'b> {
    /// Cursor that writes into `buf`, starting at offset 0
    pub fn output(buf: &'b mut [u8]) -> Self {
        Self {
            storage: Storage::Output(buf),
            offset: 0,
        }
    }

    /// Cursor that reads from `buf`, starting at offset 0
    pub fn input(buf: &'b [u8]) -> Self {
        Self {
            storage: Storage::Input(buf),
            offset: 0,
        }
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self.storage, Storage::Output(_))
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Output(buf) => buf.len(),
            Storage::Input(buf) => buf.len(),
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset
    }

    /// Bytes written (or consumed) so far
    #[cfg(test)]
    fn written(&self) -> &[u8] {
        match &self.storage {
            Storage::Output(buf) => &buf[..self.offset],
            Storage::Input(buf) => &buf[..self.offset],
        }
    }

    /// Calculate padding needed to align to the given boundary
    #[inline]
    pub fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment <= 1 {
            return 0;
        }
        debug_assert!(alignment.is_power_of_two());
        let remainder = position & (alignment - 1);
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    /// Advance to the next multiple of `alignment`
    ///
    /// Output padding is zero-filled; input padding is skipped unchecked.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = Self::align_padding(self.offset, alignment);
        if padding == 0 {
            return Ok(());
        }
        if self.is_output() {
            self.put_bytes(padding)?.fill(0);
        } else {
            self.get_bytes(padding)?;
        }
        Ok(())
    }

    /// Reserve exactly `n` bytes at the current offset for writing
    ///
    /// A read-only cursor has no writable capacity and always fails.
    pub fn put_bytes(&mut self, n: usize) -> Result<&mut [u8]> {
        let start = self.offset;
        match &mut self.storage {
            Storage::Output(buf) => {
                let end = start
                    .checked_add(n)
                    .filter(|end| *end <= buf.len())
                    .ok_or(NdrError::OutOfSpace {
                        offset: start,
                        needed: n,
                        capacity: buf.len(),
                    })?;
                self.offset = end;
                Ok(&mut buf[start..end])
            }
            Storage::Input(_) => Err(NdrError::OutOfSpace {
                offset: start,
                needed: n,
                capacity: 0,
            }),
        }
    }

    /// Consume exactly `n` bytes at the current offset
    pub fn get_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.offset;
        let remaining = self.remaining();
        if n > remaining {
            return Err(NdrError::Truncated {
                offset: start,
                needed: n,
                remaining,
            });
        }
        self.offset = start + n;
        match &self.storage {
            Storage::Output(buf) => Ok(&buf[start..start + n]),
            Storage::Input(buf) => Ok(&buf[start..start + n]),
        }
    }
}
