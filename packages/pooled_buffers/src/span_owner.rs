use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::{AllocationMode, ArrayPool, Element, Error, Result, SharedArrayPool};

/// Scoped ownership of a block of memory rented from an [`ArrayPool`], for hot-path temporaries.
///
/// This is the lightweight counterpart of [`MemoryOwner`][crate::MemoryOwner]. It borrows the
/// pool instead of holding a reference count, dereferences straight to the usable slice and has
/// no disposed state: the block goes back to the pool when the owner goes out of scope or is
/// consumed by [`dispose()`][Self::dispose], after which the owner no longer exists.
///
/// The owner is neither [`Send`] nor [`Sync`], so it cannot be moved to another thread or held
/// across an `.await` in a `Send` future. Use [`MemoryOwner`][crate::MemoryOwner] for memory
/// that needs to outlive the current scope.
///
/// # Example
///
/// ```
/// use pooled_buffers::SpanOwner;
///
/// fn checksum(data: &[u8]) -> u32 {
///     let mut scratch = SpanOwner::<u8>::allocate(data.len());
///     scratch.copy_from_slice(data);
///     scratch.sort_unstable();
///
///     scratch.iter().map(|b| u32::from(*b)).sum()
/// } // The scratch memory goes back to the pool here.
///
/// assert_eq!(checksum(&[3, 1, 2]), 6);
/// ```
pub struct SpanOwner<'pool, T: Element> {
    block: Box<[T]>,
    length: usize,

    pool: &'pool dyn ArrayPool<T>,

    // Pins the owner to the thread and scope that created it.
    _not_send: PhantomData<*const ()>,
}

impl<T: Element> SpanOwner<'static, T> {
    /// Rents `size` elements from the shared pool for `T`. The contents are unspecified.
    #[must_use]
    #[inline]
    pub fn allocate(size: usize) -> Self {
        Self::allocate_with_mode(size, AllocationMode::Default)
    }

    /// Rents `size` elements from the shared pool for `T`, optionally resetting them to
    /// `T::default()`.
    #[must_use]
    #[inline]
    pub fn allocate_with_mode(size: usize, mode: AllocationMode) -> Self {
        SpanOwner::allocate_in(size, SharedArrayPool::shared(), mode)
    }

    /// Creates an owner with a usable length of zero that holds no rented memory.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            block: Box::default(),
            length: 0,
            pool: SharedArrayPool::shared(),
            _not_send: PhantomData,
        }
    }
}

impl<'pool, T: Element> SpanOwner<'pool, T> {
    /// Rents `size` elements from `pool`. The owner cannot outlive the pool.
    ///
    /// # Example
    ///
    /// ```
    /// use pooled_buffers::{AllocationMode, SharedArrayPool, SpanOwner};
    ///
    /// let pool = SharedArrayPool::<i64>::builder().build();
    ///
    /// {
    ///     let owner = SpanOwner::allocate_in(3, &pool, AllocationMode::Clear);
    ///     assert_eq!(&*owner, &[0, 0, 0]);
    /// }
    ///
    /// assert_eq!(pool.retained(), 1);
    /// ```
    #[must_use]
    pub fn allocate_in(size: usize, pool: &'pool dyn ArrayPool<T>, mode: AllocationMode) -> Self {
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
            block,
            length: size,
            pool,
            _not_send: PhantomData,
        }
    }

    /// Copies the usable region into the start of `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `destination` is shorter than the usable region.
    pub fn copy_to(&self, destination: &mut [T]) -> Result<()> {
        let available = destination.len();
        let target = destination
            .get_mut(..self.length)
            .ok_or(Error::CapacityExceeded {
                requested: self.length,
                available,
            })?;

        target.copy_from_slice(self);
        Ok(())
    }

    /// Gives the memory back to the pool, consuming the owner.
    #[inline]
    pub fn dispose(self) {
        drop(self);
    }
}

impl<T: Element> Deref for SpanOwner<'_, T> {
    type Target = [T];

    #[expect(
        clippy::indexing_slicing,
        reason = "length never exceeds the rented block"
    )]
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.block[..self.length]
    }
}

impl<T: Element> DerefMut for SpanOwner<'_, T> {
    #[expect(
        clippy::indexing_slicing,
        reason = "length never exceeds the rented block"
    )]
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.block[..self.length]
    }
}

impl<T: Element> Drop for SpanOwner<'_, T> {
    fn drop(&mut self) {
        self.pool.give_back(mem::take(&mut self.block));
    }
}

impl<T: Element> fmt::Debug for SpanOwner<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
