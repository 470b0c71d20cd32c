use std::fmt::Debug;
use std::mem;

/// Element types that can be stored in pooled blocks.
///
/// Blocks are created filled with `T::default()` and handed out again after reuse without being
/// reset, so elements must be plain data that is valid in any state the previous renter left it.
/// This is blanket-implemented for every qualifying type.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T> Element for T where T: Copy + Default + Send + Sync + 'static {}

/// A source of reusable blocks of memory.
///
/// Callers [`rent()`][Self::rent] a block, use it and later [`give_back()`][Self::give_back] the
/// same block so a future renter can reuse the allocation. A block that is never given back is
/// simply dropped; the pool does not track outstanding rentals.
///
/// The crate provides [`SharedArrayPool`][crate::SharedArrayPool] as the default implementation.
/// Custom implementations can be supplied to [`MemoryOwner`][crate::MemoryOwner],
/// [`SpanOwner`][crate::SpanOwner] and [`ArrayPoolBufferWriter`][crate::ArrayPoolBufferWriter].
///
/// # Example
///
/// ```
/// use pooled_buffers::{ArrayPool, SharedArrayPool};
///
/// let pool = SharedArrayPool::<u8>::shared();
///
/// let mut block = pool.rent(100);
/// assert!(block.len() >= 100);
///
/// pool.resize(&mut block, 1000);
/// assert!(block.len() >= 1000);
///
/// pool.give_back(block);
/// ```
pub trait ArrayPool<T: Element>: Send + Sync + Debug {
    /// Rents a block that holds at least `minimum_length` elements.
    ///
    /// The contents of the block are unspecified: a reused block contains whatever the previous
    /// renter left in it. Renting zero elements returns an empty block.
    #[must_use]
    fn rent(&self, minimum_length: usize) -> Box<[T]>;

    /// Returns a block previously obtained from [`rent()`][Self::rent] to the pool.
    fn give_back(&self, block: Box<[T]>);

    /// Replaces `block` with a block of at least `new_length` elements rented from this pool.
    ///
    /// The first `min(block.len(), new_length)` elements are copied into the new block and the
    /// old block is given back to the pool. Nothing happens if `block` already has exactly
    /// `new_length` elements.
    fn resize(&self, block: &mut Box<[T]>, new_length: usize) {
        if block.len() == new_length {
            return;
        }

        let mut replacement = self.rent(new_length);
        let preserved = block.len().min(new_length).min(replacement.len());

        #[expect(
            clippy::indexing_slicing,
            reason = "preserved is bounded by the length of both blocks"
        )]
        replacement[..preserved].copy_from_slice(&block[..preserved]);

        let previous = mem::replace(block, replacement);
        self.give_back(previous);
    }
}
