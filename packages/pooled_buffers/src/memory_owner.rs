use std::any::type_name;
use std::fmt;
use std::mem;
use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::{AllocationMode, ArrayPool, Element, Error, PoolRef, Result};

/// Exclusive ownership of a block of memory rented from an [`ArrayPool`].
///
/// The usable region has exactly the length requested at allocation time, even though the
/// rented block may be larger. The block goes back to the pool when the owner is disposed via
/// [`dispose()`][Self::dispose] or dropped, whichever comes first. Disposing more than once is
/// a no-op.
///
/// Once disposed, every accessor returns [`Error::Disposed`].
///
/// Use [`SpanOwner`][crate::SpanOwner] instead for short-lived scratch memory that never leaves
/// the current scope; use `MemoryOwner` when the memory has to be stored in a struct, moved to
/// another thread or kept across an `.await`.
///
/// # Example
///
/// ```
/// use pooled_buffers::{AllocationMode, MemoryOwner};
///
/// let mut owner = MemoryOwner::<u8>::allocate_with_mode(100, AllocationMode::Clear);
/// assert_eq!(owner.len(), 100);
///
/// owner.span_mut()?.copy_from_slice(&[7; 100]);
/// assert!(owner.span()?.iter().all(|b| *b == 7));
///
/// owner.dispose();
/// assert!(owner.span().is_err());
///
/// // Disposing again does nothing.
/// owner.dispose();
/// # Ok::<(), pooled_buffers::Error>(())
/// ```
///
/// # Thread safety
///
/// The owner is thread-mobile ([`Send`]) and can be shared by reference ([`Sync`]); mutation
/// requires exclusive access.
pub struct MemoryOwner<T: Element> {
    /// `None` once the block has been given back to the pool.
    block: Option<Box<[T]>>,

    start: usize,
    length: usize,

    pool: PoolRef<T>,
}

impl<T: Element> MemoryOwner<T> {
    /// Rents `size` elements from the shared pool for `T`. The contents are unspecified.
    #[must_use]
    #[inline]
    pub fn allocate(size: usize) -> Self {
        Self::allocate_with_mode(size, AllocationMode::Default)
    }

    /// Rents `size` elements from the shared pool for `T`, optionally resetting them to
    /// `T::default()`.
    #[must_use]
    pub fn allocate_with_mode(size: usize, mode: AllocationMode) -> Self {
        Self::new_inner(size, PoolRef::shared(), mode)
    }

    /// Rents `size` elements from a caller-supplied pool.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use pooled_buffers::{AllocationMode, ArrayPool, MemoryOwner, SharedArrayPool};
    ///
    /// let pool = Arc::new(SharedArrayPool::<u32>::builder().build());
    /// let dyn_pool: Arc<dyn ArrayPool<u32>> = pool.clone();
    ///
    /// let owner = MemoryOwner::allocate_in(10, dyn_pool, AllocationMode::Clear);
    /// assert_eq!(owner.span()?, &[0; 10]);
    ///
    /// drop(owner);
    /// assert_eq!(pool.retained(), 1);
    /// # Ok::<(), pooled_buffers::Error>(())
    /// ```
    #[must_use]
    pub fn allocate_in(size: usize, pool: Arc<dyn ArrayPool<T>>, mode: AllocationMode) -> Self {
        Self::new_inner(size, PoolRef::from(pool), mode)
    }

    /// Creates an owner with a usable length of zero that holds no rented memory.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            block: Some(Box::default()),
            start: 0,
            length: 0,
            pool: PoolRef::shared(),
        }
    }

    fn new_inner(size: usize, pool: PoolRef<T>, mode: AllocationMode) -> Self {
        let mut block = pool.rent(size);
        debug_assert!(block.len() >= size);

        if mode == AllocationMode::Clear {
            #[expect(
                clippy::indexing_slicing,
                reason = "the pool guarantees the block is at least as long as requested"
            )]
            block[..size].fill(T::default());
        }

        Self {
            block: Some(block),
            start: 0,
            length: size,
            pool,
        }
    }

    /// The number of usable elements.
    ///
    /// This stays the same after disposal; use [`is_disposed()`][Self::is_disposed] to check
    /// whether the memory is still accessible.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the usable region has zero elements.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether the memory has been given back to the pool.
    #[must_use]
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.block.is_none()
    }

    fn region(&self) -> Range<usize> {
        // Cannot overflow: start + length never exceeds the block length.
        self.start..self.start.wrapping_add(self.length)
    }

    /// The usable region as a shared slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the owner has been disposed.
    pub fn span(&self) -> Result<&[T]> {
        let region = self.region();

        self.block
            .as_deref()
            .and_then(|block| block.get(region))
            .ok_or_else(Error::disposed::<Self>)
    }

    /// The usable region as an exclusive slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the owner has been disposed.
    pub fn span_mut(&mut self) -> Result<&mut [T]> {
        let region = self.region();

        self.block
            .as_deref_mut()
            .and_then(|block| block.get_mut(region))
            .ok_or_else(Error::disposed::<Self>)
    }

    /// Transfers ownership of a sub-range of the usable region to a new owner.
    ///
    /// The original owner is consumed; the new owner gives the whole block back to the pool
    /// when disposed.
    ///
    /// # Example
    ///
    /// ```
    /// use pooled_buffers::{AllocationMode, MemoryOwner};
    ///
    /// let mut owner = MemoryOwner::<u8>::allocate_with_mode(8, AllocationMode::Clear);
    /// owner.span_mut()?.copy_from_slice(b"abcdefgh");
    ///
    /// let middle = owner.slice(2, 3)?;
    /// assert_eq!(middle.span()?, b"cde");
    /// # Ok::<(), pooled_buffers::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the owner has been disposed, otherwise
    /// [`Error::InvalidArgument`] naming `start` or `length` if `start + length` exceeds
    /// [`len()`][Self::len].
    pub fn slice(mut self, start: usize, length: usize) -> Result<Self> {
        if self.is_disposed() {
            return Err(Error::disposed::<Self>());
        }

        if start > self.length {
            return Err(Error::InvalidArgument {
                name: "start",
                problem: format!(
                    "{start} is outside of the {} usable elements",
                    self.length
                ),
            });
        }

        // Cannot underflow: we just checked that start is within the usable region.
        let remaining = self.length.wrapping_sub(start);

        if length > remaining {
            return Err(Error::InvalidArgument {
                name: "length",
                problem: format!(
                    "{length} elements starting at {start} exceeds the {} usable elements",
                    self.length
                ),
            });
        }

        let block = self.block.take().ok_or_else(Error::disposed::<Self>)?;

        Ok(Self {
            block: Some(block),
            // Cannot overflow: start is within the current region, which is within the block.
            start: self.start.wrapping_add(start),
            length,
            pool: self.take_pool(),
        })
    }

    fn take_pool(&mut self) -> PoolRef<T> {
        // The consumed owner keeps a reference to the shared pool; it has no block to return.
        mem::replace(&mut self.pool, PoolRef::shared())
    }

    /// Copies the usable region into the start of `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `destination` is shorter than the usable region
    /// and [`Error::Disposed`] if the owner has been disposed.
    pub fn copy_to(&self, destination: &mut [T]) -> Result<()> {
        let source = self.span()?;

        let available = destination.len();
        let target = destination
            .get_mut(..source.len())
            .ok_or(Error::CapacityExceeded {
                requested: source.len(),
                available,
            })?;

        target.copy_from_slice(source);
        Ok(())
    }

    /// Copies the usable region into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the owner has been disposed.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.span().map(<[T]>::to_vec)
    }

    /// Gives the memory back to the pool. Calling this more than once has no effect.
    pub fn dispose(&mut self) {
        if let Some(block) = self.block.take() {
            self.pool.give_back(block);
        }
    }
}

impl<T: Element> Drop for MemoryOwner<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            trace!(
                length = self.length,
                "{} dropped without being disposed, giving back its block",
                type_name::<Self>()
            );
            self.pool.give_back(block);
        }
    }
}

impl<T: Element> fmt::Debug for MemoryOwner<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("length", &self.length)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
