use crate::{Element, Result};

/// A sink that hands out room for more elements and is told afterwards how many were written.
///
/// Callers ask for a writable slice of at least a given length with
/// [`get_span()`][Self::get_span], fill some prefix of it and then commit that prefix with
/// [`advance()`][Self::advance]. Nothing becomes part of the written data until it is
/// committed.
///
/// # Example
///
/// ```
/// use pooled_buffers::{ArrayPoolBufferWriter, BufferWriter};
///
/// fn write_greeting(writer: &mut impl BufferWriter<u8>) -> Result<(), pooled_buffers::Error> {
///     let span = writer.get_span(5)?;
///     span[..5].copy_from_slice(b"hello");
///     writer.advance(5)?;
///
///     writer.write(b", world")
/// }
///
/// let mut writer = ArrayPoolBufferWriter::<u8>::new();
/// write_greeting(&mut writer)?;
///
/// assert_eq!(writer.written_span()?, b"hello, world");
/// # Ok::<(), pooled_buffers::Error>(())
/// ```
pub trait BufferWriter<T: Element> {
    /// Returns a writable slice starting at the write cursor that holds at least `size_hint`
    /// elements. A `size_hint` of zero is treated as one.
    ///
    /// The cursor does not move; call [`advance()`][Self::advance] to commit written elements.
    ///
    /// # Errors
    ///
    /// Implementations fail if they cannot provide the requested room.
    fn get_span(&mut self, size_hint: usize) -> Result<&mut [T]>;

    /// Commits `count` elements written to the slice most recently returned by
    /// [`get_span()`][Self::get_span].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdvanceOverrun`][crate::Error::AdvanceOverrun] if `count` exceeds the
    /// free capacity.
    fn advance(&mut self, count: usize) -> Result<()>;

    /// Copies `items` to the writer and commits them. Writing an empty slice does nothing.
    ///
    /// # Errors
    ///
    /// Fails if the writer cannot provide room for all of `items`.
    fn write(&mut self, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let span = self.get_span(items.len())?;
        debug_assert!(span.len() >= items.len());

        #[expect(
            clippy::indexing_slicing,
            reason = "get_span returns at least as many elements as requested"
        )]
        span[..items.len()].copy_from_slice(items);

        self.advance(items.len())
    }
}
