use std::any::type_name;
use std::fmt;
use std::io;

use crate::{BufferWriter, Element, Error, Result};

/// A [`BufferWriter`] over a fixed slice supplied by the caller.
///
/// The writer never reallocates. Asking for more room than the free region has fails with
/// [`Error::CapacityExceeded`]; switch to [`ArrayPoolBufferWriter`][crate::ArrayPoolBufferWriter]
/// when the output size is not known up front.
///
/// # Example
///
/// ```
/// use pooled_buffers::{BufferWriter, MemoryBufferWriter};
///
/// let mut storage = [0_u16; 4];
/// let mut writer = MemoryBufferWriter::new(&mut storage);
///
/// writer.write(&[1, 2, 3])?;
/// assert_eq!(writer.written_span(), &[1, 2, 3]);
/// assert_eq!(writer.free_capacity(), 1);
///
/// assert!(writer.write(&[4, 5]).is_err());
/// # Ok::<(), pooled_buffers::Error>(())
/// ```
pub struct MemoryBufferWriter<'a, T: Element> {
    memory: &'a mut [T],

    /// Number of committed elements at the start of `memory`.
    index: usize,
}

impl<'a, T: Element> MemoryBufferWriter<'a, T> {
    /// Creates a writer that fills `memory` from the start.
    #[must_use]
    #[inline]
    pub fn new(memory: &'a mut [T]) -> Self {
        Self { memory, index: 0 }
    }

    /// The committed elements.
    #[must_use]
    #[inline]
    #[expect(
        clippy::indexing_slicing,
        reason = "the cursor never moves past the end of the memory"
    )]
    pub fn written_span(&self) -> &[T] {
        &self.memory[..self.index]
    }

    /// Consumes the writer, returning the committed elements with the full borrow lifetime.
    #[must_use]
    #[expect(
        clippy::indexing_slicing,
        reason = "the cursor never moves past the end of the memory"
    )]
    pub fn into_written(self) -> &'a [T] {
        let Self { memory, index } = self;
        &memory[..index]
    }

    /// The number of committed elements.
    #[must_use]
    #[inline]
    pub fn written_count(&self) -> usize {
        self.index
    }

    /// The total number of elements the writer can hold.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// The number of elements that can still be written.
    #[must_use]
    #[inline]
    pub fn free_capacity(&self) -> usize {
        // Cannot underflow: the cursor never moves past the end of the memory.
        self.memory.len().wrapping_sub(self.index)
    }

    /// Resets the committed elements to `T::default()` and moves the cursor back to the start.
    pub fn clear(&mut self) {
        #[expect(
            clippy::indexing_slicing,
            reason = "the cursor never moves past the end of the memory"
        )]
        self.memory[..self.index].fill(T::default());

        self.index = 0;
    }
}

impl<T: Element> BufferWriter<T> for MemoryBufferWriter<'_, T> {
    /// Returns the free region if it holds at least `size_hint` elements (treating zero as one).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the free region is smaller than requested.
    fn get_span(&mut self, size_hint: usize) -> Result<&mut [T]> {
        let requested = size_hint.max(1);
        let available = self.free_capacity();

        if requested > available {
            return Err(Error::CapacityExceeded {
                requested,
                available,
            });
        }

        #[expect(
            clippy::indexing_slicing,
            reason = "the cursor never moves past the end of the memory"
        )]
        let free_region = &mut self.memory[self.index..];

        Ok(free_region)
    }

    fn advance(&mut self, count: usize) -> Result<()> {
        let available = self.free_capacity();

        if count > available {
            return Err(Error::AdvanceOverrun { count, available });
        }

        // Cannot overflow: we just checked that the new index stays within the memory.
        self.index = self.index.wrapping_add(count);
        Ok(())
    }
}

impl io::Write for MemoryBufferWriter<'_, u8> {
    /// Writes as much of `buf` as fits, returning `Ok(0)` once the memory is full.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = buf.len().min(self.free_capacity());

        #[expect(
            clippy::indexing_slicing,
            reason = "count is bounded by the length of buf"
        )]
        BufferWriter::write(self, &buf[..count]).map_err(io::Error::other)?;

        Ok(count)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Element> fmt::Debug for MemoryBufferWriter<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("written_count", &self.index)
            .field("capacity", &self.memory.len())
            .finish_non_exhaustive()
    }
}
