use std::any::type_name;
use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;

use tracing::trace;

use crate::{ArrayPool, BufferWriter, Element, Error, PoolRef, Result};

/// How many elements a writer can hold before it first needs to grow, unless configured otherwise.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Above this size, growth rounds up to the next power of two so that repeated small writes to
/// a large buffer do not trigger a reallocation each time.
const LARGE_GROWTH_THRESHOLD: usize = 1024 * 1024;

/// A growable [`BufferWriter`] whose storage is rented from an [`ArrayPool`].
///
/// The writer starts with an initial block and, whenever a request does not fit in the free
/// region, rents a larger block, copies the written data over and gives the old block back.
/// The written data is always the prefix `[0, written_count())` of the current block.
///
/// The block goes back to the pool when the writer is disposed via [`dispose()`][Self::dispose]
/// or dropped, whichever comes first. After disposal every operation that touches the buffer
/// returns [`Error::Disposed`].
///
/// # Example
///
/// ```
/// use pooled_buffers::{ArrayPoolBufferWriter, BufferWriter};
///
/// let mut writer = ArrayPoolBufferWriter::<u8>::new();
///
/// for byte in 0..=255_u8 {
///     writer.write(&[byte])?;
/// }
/// writer.write(&[0; 44])?;
///
/// assert_eq!(writer.written_count(), 300);
/// assert!(writer.capacity() >= 300);
/// # Ok::<(), pooled_buffers::Error>(())
/// ```
///
/// # Thread safety
///
/// The writer is thread-mobile ([`Send`]) and can be shared by reference ([`Sync`]); writing
/// requires exclusive access.
pub struct ArrayPoolBufferWriter<T: Element> {
    /// `None` once the block has been given back to the pool.
    block: Option<Box<[T]>>,

    /// Number of committed elements at the start of the block.
    index: usize,

    pool: PoolRef<T>,
}

impl<T: Element> ArrayPoolBufferWriter<T> {
    /// Creates a writer with the default initial capacity, renting from the shared pool for `T`.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates a writer that can hold at least `initial_capacity` elements before growing,
    /// renting from the shared pool for `T`.
    #[must_use]
    #[inline]
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::new_inner(PoolRef::shared(), initial_capacity)
    }

    /// Creates a builder for configuring the pool and initial capacity of a writer.
    #[inline]
    pub fn builder() -> ArrayPoolBufferWriterBuilder<T> {
        ArrayPoolBufferWriterBuilder::new()
    }

    fn new_inner(pool: PoolRef<T>, initial_capacity: usize) -> Self {
        Self {
            block: Some(pool.rent(initial_capacity)),
            index: 0,
            pool,
        }
    }

    /// The committed elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the writer has been disposed.
    pub fn written_span(&self) -> Result<&[T]> {
        self.block
            .as_deref()
            .and_then(|block| block.get(..self.index))
            .ok_or_else(Error::disposed::<Self>)
    }

    /// The number of committed elements. Zero once disposed.
    #[must_use]
    #[inline]
    pub fn written_count(&self) -> usize {
        self.index
    }

    /// The total number of elements the current block holds. Zero once disposed.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.as_ref().map_or(0, |block| block.len())
    }

    /// The number of elements that can be written before the writer has to grow.
    /// Zero once disposed.
    #[must_use]
    #[inline]
    pub fn free_capacity(&self) -> usize {
        // Cannot underflow: the cursor never moves past the end of the block.
        self.capacity().wrapping_sub(self.index)
    }

    /// Whether the block has been given back to the pool.
    #[must_use]
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.block.is_none()
    }

    /// Resets the committed elements to `T::default()` and moves the cursor back to the start.
    ///
    /// The block is kept, so the capacity does not change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the writer has been disposed.
    pub fn clear(&mut self) -> Result<()> {
        let written = self
            .block
            .as_deref_mut()
            .and_then(|block| block.get_mut(..self.index))
            .ok_or_else(Error::disposed::<Self>)?;

        written.fill(T::default());
        self.index = 0;
        Ok(())
    }

    /// Gives the block back to the pool. Calling this more than once has no effect.
    pub fn dispose(&mut self) {
        if let Some(block) = self.block.take() {
            self.index = 0;
            self.pool.give_back(block);
        }
    }

    /// Makes sure the free region holds at least `size_hint` elements (treating zero as one),
    /// growing the block if necessary.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    fn ensure_capacity(&mut self, size_hint: usize) -> Result<&mut [T]> {
        let size_hint = size_hint.max(1);
        let index = self.index;

        let block = self.block.as_mut().ok_or_else(Error::disposed::<Self>)?;

        // Cannot underflow: the cursor never moves past the end of the block.
        let free = block.len().wrapping_sub(index);

        if size_hint > free {
            let new_length = grown_length::<T>(index, size_hint)?;

            trace!(
                written = index,
                old_capacity = block.len(),
                new_length,
                "growing {}",
                type_name::<Self>()
            );

            self.pool.resize(block, new_length);
        }

        debug_assert!(block.len().wrapping_sub(index) >= size_hint);

        #[expect(
            clippy::indexing_slicing,
            reason = "the cursor never moves past the end of the block"
        )]
        let free_region = &mut block[index..];

        Ok(free_region)
    }
}

/// The block length needed to hold `size_hint` more elements after `index` written ones.
///
/// Fails if the block could never be allocated, which includes `index + size_hint` wrapping
/// around and exceeding the `isize::MAX` byte limit of a single allocation.
fn grown_length<T>(index: usize, size_hint: usize) -> Result<usize> {
    let max_length = (usize::MAX >> 1)
        .checked_div(mem::size_of::<T>())
        .unwrap_or(usize::MAX);

    let minimum = index
        .checked_add(size_hint)
        .filter(|minimum| *minimum <= max_length)
        .ok_or_else(|| Error::InvalidArgument {
            name: "size_hint",
            problem: format!(
                "{size_hint} more elements after {index} written ones exceeds the largest possible allocation of {max_length} elements"
            ),
        })?;

    if minimum <= LARGE_GROWTH_THRESHOLD {
        return Ok(minimum);
    }

    // Near the allocation limit the rounded length may not fit; the exact length still does.
    Ok(minimum
        .checked_next_power_of_two()
        .filter(|rounded| *rounded <= max_length)
        .unwrap_or(minimum))
}

impl<T: Element> BufferWriter<T> for ArrayPoolBufferWriter<T> {
    /// Returns a writable slice at the write cursor, growing the block first if the free region
    /// is smaller than `size_hint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the writer has been disposed.
    fn get_span(&mut self, size_hint: usize) -> Result<&mut [T]> {
        self.ensure_capacity(size_hint)
    }

    fn advance(&mut self, count: usize) -> Result<()> {
        if self.block.is_none() {
            return Err(Error::disposed::<Self>());
        }

        let available = self.free_capacity();

        if count > available {
            return Err(Error::AdvanceOverrun { count, available });
        }

        // Cannot overflow: we just checked that the new index stays within the block.
        self.index = self.index.wrapping_add(count);
        Ok(())
    }
}

impl<T: Element> Default for ArrayPoolBufferWriter<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Drop for ArrayPoolBufferWriter<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            trace!(
                written = self.index,
                "{} dropped without being disposed, giving back its block",
                type_name::<Self>()
            );
            self.pool.give_back(block);
        }
    }
}

impl io::Write for ArrayPoolBufferWriter<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferWriter::write(self, buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Element> fmt::Debug for ArrayPoolBufferWriter<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("written_count", &self.index)
            .field("capacity", &self.capacity())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Builder for creating an instance of [`ArrayPoolBufferWriter`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use pooled_buffers::{ArrayPool, ArrayPoolBufferWriter, SharedArrayPool};
///
/// let pool: Arc<dyn ArrayPool<u8>> = Arc::new(SharedArrayPool::<u8>::builder().build());
///
/// let writer = ArrayPoolBufferWriter::builder()
///     .pool(pool)
///     .initial_capacity(4096)
///     .build();
///
/// assert_eq!(writer.capacity(), 4096);
/// ```
#[must_use]
pub struct ArrayPoolBufferWriterBuilder<T: Element> {
    pool: Option<Arc<dyn ArrayPool<T>>>,
    initial_capacity: usize,
}

impl<T: Element> ArrayPoolBufferWriterBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            pool: None,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }

    /// Sets the pool to rent blocks from. By default, the shared pool for `T` is used.
    #[inline]
    pub fn pool(mut self, pool: Arc<dyn ArrayPool<T>>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the number of elements the writer can hold before it first needs to grow.
    #[inline]
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Builds the writer, renting its initial block.
    #[must_use]
    pub fn build(self) -> ArrayPoolBufferWriter<T> {
        let pool = self.pool.map_or_else(PoolRef::shared, PoolRef::from);
        ArrayPoolBufferWriter::new_inner(pool, self.initial_capacity)
    }
}

impl<T: Element> fmt::Debug for ArrayPoolBufferWriterBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("custom_pool", &self.pool.is_some())
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::SharedArrayPool;

    assert_impl_all!(ArrayPoolBufferWriter<u8>: Send, Sync, fmt::Debug, Default);
    assert_impl_all!(ArrayPoolBufferWriterBuilder<u8>: Send, Sync, fmt::Debug);

    /// Hands out exactly the requested length and counts traffic.
    #[derive(Debug, Default)]
    struct ExactPool {
        rented: AtomicUsize,
        returned: AtomicUsize,
        largest_request: AtomicUsize,
    }

    impl ArrayPool<u8> for ExactPool {
        fn rent(&self, minimum_length: usize) -> Box<[u8]> {
            self.rented.fetch_add(1, Ordering::Relaxed);
            self.largest_request
                .fetch_max(minimum_length, Ordering::Relaxed);
            vec![0; minimum_length].into_boxed_slice()
        }

        fn give_back(&self, _block: Box<[u8]>) {
            self.returned.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn exact_writer(initial_capacity: usize) -> (Arc<ExactPool>, ArrayPoolBufferWriter<u8>) {
        let pool = Arc::new(ExactPool::default());
        let writer = ArrayPoolBufferWriter::builder()
            .pool(Arc::clone(&pool) as Arc<dyn ArrayPool<u8>>)
            .initial_capacity(initial_capacity)
            .build();
        (pool, writer)
    }

    #[test]
    fn new_writer_is_empty() {
        let writer = ArrayPoolBufferWriter::<u8>::new();

        assert_eq!(writer.written_count(), 0);
        assert_eq!(writer.capacity(), DEFAULT_INITIAL_CAPACITY);
        assert_eq!(writer.free_capacity(), DEFAULT_INITIAL_CAPACITY);
        assert!(writer.written_span().unwrap().is_empty());
    }

    #[test]
    fn get_span_does_not_move_cursor() {
        let mut writer = ArrayPoolBufferWriter::<u8>::new();

        let span = writer.get_span(10).unwrap();
        assert!(span.len() >= 10);

        assert_eq!(writer.written_count(), 0);
    }

    #[test]
    fn zero_size_hint_is_treated_as_one() {
        let (_, mut writer) = exact_writer(2);
        writer.write(&[1, 2]).unwrap();
        assert_eq!(writer.free_capacity(), 0);

        let span = writer.get_span(0).unwrap();
        assert_eq!(span.len(), 1);
        assert_eq!(writer.capacity(), 3);
    }

    #[test]
    fn byte_at_a_time_grows_past_initial_capacity() {
        let mut writer = ArrayPoolBufferWriter::<u8>::new();

        for i in 0..300_u32 {
            let span = writer.get_span(1).unwrap();
            span[0] = (i % 256) as u8;
            writer.advance(1).unwrap();
        }

        assert!(writer.capacity() > DEFAULT_INITIAL_CAPACITY);

        let written = writer.written_span().unwrap();
        assert_eq!(written.len(), 300);
        assert!(
            written
                .iter()
                .enumerate()
                .all(|(i, b)| usize::from(*b) == i % 256)
        );
    }

    #[test]
    fn growth_requests_cursor_plus_hint() {
        let (pool, mut writer) = exact_writer(8);
        writer.write(&[7; 6]).unwrap();

        writer.get_span(10).unwrap();

        assert_eq!(pool.largest_request.load(Ordering::Relaxed), 16);
        assert_eq!(pool.returned.load(Ordering::Relaxed), 1);
        assert_eq!(writer.written_span().unwrap(), &[7; 6]);
    }

    #[test]
    fn large_growth_rounds_to_power_of_two() {
        let (pool, mut writer) = exact_writer(16);
        writer.write(&[1; 10]).unwrap();

        writer.get_span(LARGE_GROWTH_THRESHOLD).unwrap();

        let requested = pool.largest_request.load(Ordering::Relaxed);
        assert_eq!(requested, (LARGE_GROWTH_THRESHOLD + 10).next_power_of_two());
        assert_eq!(writer.capacity(), requested);
    }

    #[test]
    fn unallocatable_size_hint_fails_without_growing() {
        let mut writer = ArrayPoolBufferWriter::<u64>::new();
        writer.write(&[1]).unwrap();
        let capacity = writer.capacity();

        for size_hint in [usize::MAX - 1, usize::MAX, usize::MAX / 8] {
            assert!(matches!(
                writer.get_span(size_hint),
                Err(Error::InvalidArgument {
                    name: "size_hint",
                    ..
                })
            ));
        }

        assert_eq!(writer.capacity(), capacity);
        assert_eq!(writer.written_span().unwrap(), &[1]);
    }

    #[test]
    fn grown_length_limits() {
        // Exact below the threshold, rounded above it.
        assert_eq!(grown_length::<u8>(10, 6).unwrap(), 16);
        assert_eq!(grown_length::<u8>(0, 1_000_000).unwrap(), 1_000_000);
        assert_eq!(
            grown_length::<u8>(1, LARGE_GROWTH_THRESHOLD).unwrap(),
            LARGE_GROWTH_THRESHOLD * 2
        );

        // The largest u64 block that can exist is isize::MAX bytes.
        let max_u64 = (usize::MAX >> 1) / 8;
        assert_eq!(grown_length::<u64>(0, max_u64).unwrap(), max_u64);
        assert!(grown_length::<u64>(1, max_u64).is_err());
        assert!(grown_length::<u8>(usize::MAX, 1).is_err());

        // Zero-sized elements never hit the byte limit.
        assert_eq!(grown_length::<()>(0, usize::MAX).unwrap(), usize::MAX);
    }

    #[test]
    fn advance_past_end_fails() {
        let (_, mut writer) = exact_writer(4);

        writer.advance(3).unwrap();

        assert!(matches!(
            writer.advance(2),
            Err(Error::AdvanceOverrun {
                count: 2,
                available: 1
            })
        ));
        assert_eq!(writer.written_count(), 3);

        writer.advance(1).unwrap();
        assert_eq!(writer.free_capacity(), 0);
    }

    #[test]
    fn clear_resets_written_region_and_keeps_block() {
        let mut writer = ArrayPoolBufferWriter::<u8>::with_capacity(32);
        writer.write(b"secret").unwrap();
        let capacity = writer.capacity();

        writer.clear().unwrap();

        assert_eq!(writer.written_count(), 0);
        assert_eq!(writer.capacity(), capacity);

        // The previously written region has been reset.
        let span = writer.get_span(6).unwrap();
        assert_eq!(&span[..6], &[0; 6]);
    }

    #[test]
    fn dispose_is_idempotent() {
        let (pool, mut writer) = exact_writer(4);

        writer.dispose();
        writer.dispose();
        drop(writer);

        assert_eq!(pool.rented.load(Ordering::Relaxed), 1);
        assert_eq!(pool.returned.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn drop_gives_back_block() {
        let (pool, writer) = exact_writer(4);

        drop(writer);

        assert_eq!(pool.returned.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn disposed_writer_rejects_everything() {
        let mut writer = ArrayPoolBufferWriter::<u8>::new();
        writer.write(b"abc").unwrap();
        writer.dispose();

        assert!(writer.is_disposed());
        assert_eq!(writer.capacity(), 0);
        assert_eq!(writer.free_capacity(), 0);
        assert_eq!(writer.written_count(), 0);
        assert!(matches!(writer.written_span(), Err(Error::Disposed { .. })));
        assert!(matches!(writer.get_span(1), Err(Error::Disposed { .. })));
        assert!(matches!(writer.advance(0), Err(Error::Disposed { .. })));
        assert!(matches!(writer.clear(), Err(Error::Disposed { .. })));
    }

    #[test]
    fn io_write_appends() {
        use std::io::Write as _;

        let mut writer = ArrayPoolBufferWriter::<u8>::with_capacity(4);

        write!(writer, "{}-{}", 12, "abc").unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.written_span().unwrap(), b"12-abc");
    }

    #[test]
    fn shared_pool_receives_block_back() {
        let pool = Arc::new(SharedArrayPool::<u8>::builder().build());
        let mut writer = ArrayPoolBufferWriter::builder()
            .pool(Arc::clone(&pool) as Arc<dyn ArrayPool<u8>>)
            .initial_capacity(100)
            .build();

        writer.write(&[1; 200]).unwrap();
        // The initial block went back when the writer grew.
        assert_eq!(pool.retained(), 1);

        writer.dispose();
        assert_eq!(pool.retained(), 2);
    }
}
