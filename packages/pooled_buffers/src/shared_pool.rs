use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::sync::LazyLock;

use foldhash::fast::RandomState;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::{ArrayPool, Element};

/// Smallest block the shared pool hands out. Smaller requests are rounded up to this.
const MIN_ARRAY_LENGTH: usize = 16;

/// Largest block length retained for reuse unless configured otherwise.
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 1024 * 1024;

/// How many blocks of each size class are retained unless configured otherwise.
pub const DEFAULT_MAX_ARRAYS_PER_BUCKET: usize = 50;

type PoolRegistry = HashMap<TypeId, &'static (dyn Any + Send + Sync), RandomState>;

/// One process-wide pool per element type, created on first use and never dropped.
static SHARED_POOLS: LazyLock<RwLock<PoolRegistry>> =
    LazyLock::new(|| RwLock::new(HashMap::default()));

/// An [`ArrayPool`] that retains returned blocks in power-of-two size classes.
///
/// Requests are rounded up to the next power of two (at least 16 elements) and served from a
/// matching size class when a retained block is available. Requests longer than the maximum
/// pooled length are allocated exactly and dropped instead of retained when given back. Each size
/// class retains a bounded number of blocks; surplus blocks are dropped.
///
/// Every size class is guarded by its own lock, so renting blocks of different sizes from
/// multiple threads does not contend.
///
/// # Example
///
/// ```
/// use pooled_buffers::{ArrayPool, SharedArrayPool};
///
/// let pool = SharedArrayPool::<u8>::builder().build();
///
/// let block = pool.rent(100);
/// assert_eq!(block.len(), 128);
///
/// pool.give_back(block);
/// assert_eq!(pool.retained(), 1);
///
/// // The retained block is handed out again.
/// let block = pool.rent(120);
/// assert_eq!(block.len(), 128);
/// assert_eq!(pool.retained(), 0);
/// ```
pub struct SharedArrayPool<T: Element> {
    /// Index `i` holds blocks of length `MIN_ARRAY_LENGTH << i`.
    buckets: Box<[Mutex<Vec<Box<[T]>>>]>,

    max_array_length: usize,
    max_arrays_per_bucket: usize,
}

impl<T: Element> SharedArrayPool<T> {
    /// Creates a builder for configuring and constructing a [`SharedArrayPool`].
    #[inline]
    pub fn builder() -> SharedArrayPoolBuilder<T> {
        SharedArrayPoolBuilder::new()
    }

    /// Returns the process-wide pool for element type `T`.
    ///
    /// The pool is created with default settings on first use and lives until the process ends.
    ///
    /// # Example
    ///
    /// ```
    /// use pooled_buffers::SharedArrayPool;
    ///
    /// let first = SharedArrayPool::<u16>::shared();
    /// let second = SharedArrayPool::<u16>::shared();
    ///
    /// assert!(std::ptr::eq(first, second));
    /// ```
    #[must_use]
    pub fn shared() -> &'static Self {
        let type_id = TypeId::of::<T>();

        if let Some(pool) = SHARED_POOLS.read().get(&type_id).copied() {
            return pool
                .downcast_ref::<Self>()
                .expect("shared pools are registered under the TypeId of their element type");
        }

        let mut pools = SHARED_POOLS.write();
        let pool = *pools.entry(type_id).or_insert_with(|| {
            debug!(element = type_name::<T>(), "creating shared array pool");
            let pool: &'static (dyn Any + Send + Sync) =
                Box::leak(Box::new(Self::builder().build()));
            pool
        });

        pool.downcast_ref::<Self>()
            .expect("shared pools are registered under the TypeId of their element type")
    }

    fn new_inner(max_array_length: usize, max_arrays_per_bucket: usize) -> Self {
        debug_assert!(max_array_length.is_power_of_two());
        debug_assert!(max_array_length >= MIN_ARRAY_LENGTH);

        // One bucket per power of two from MIN_ARRAY_LENGTH up to and including the maximum.
        let bucket_count = class_index(max_array_length).wrapping_add(1);

        Self {
            buckets: (0..bucket_count).map(|_| Mutex::new(Vec::new())).collect(),
            max_array_length,
            max_arrays_per_bucket,
        }
    }

    /// The longest block this pool retains for reuse.
    #[must_use]
    #[inline]
    pub fn max_array_length(&self) -> usize {
        self.max_array_length
    }

    /// How many blocks of each size class this pool retains at most.
    #[must_use]
    #[inline]
    pub fn max_arrays_per_bucket(&self) -> usize {
        self.max_arrays_per_bucket
    }

    /// The number of blocks currently held by the pool, ready to be rented again.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.lock().len()).sum()
    }

    /// Maps a block length to the index of the size class that serves it, if it is poolable.
    fn bucket_index(&self, length: usize) -> Option<usize> {
        if length > self.max_array_length {
            return None;
        }

        Some(class_index(length.max(MIN_ARRAY_LENGTH).next_power_of_two()))
    }
}

/// Index of the size class for a power-of-two length of at least `MIN_ARRAY_LENGTH`.
fn class_index(class_length: usize) -> usize {
    debug_assert!(class_length.is_power_of_two());

    // Cannot underflow: the class length is at least MIN_ARRAY_LENGTH.
    class_length
        .trailing_zeros()
        .wrapping_sub(MIN_ARRAY_LENGTH.trailing_zeros()) as usize
}

impl<T: Element> ArrayPool<T> for SharedArrayPool<T> {
    fn rent(&self, minimum_length: usize) -> Box<[T]> {
        if minimum_length == 0 {
            return Box::default();
        }

        let Some(index) = self.bucket_index(minimum_length) else {
            trace!(
                minimum_length,
                max_array_length = self.max_array_length,
                "allocating unpooled block"
            );
            return vec![T::default(); minimum_length].into_boxed_slice();
        };

        let bucket = self
            .buckets
            .get(index)
            .expect("bucket_index only returns indexes of existing buckets");

        if let Some(block) = bucket.lock().pop() {
            return block;
        }

        vec![T::default(); MIN_ARRAY_LENGTH << index].into_boxed_slice()
    }

    fn give_back(&self, block: Box<[T]>) {
        let length = block.len();

        if length == 0 {
            return;
        }

        // Only blocks that exactly match a size class can be handed out again.
        let bucket = if length.is_power_of_two() && length >= MIN_ARRAY_LENGTH {
            self.bucket_index(length)
                .and_then(|index| self.buckets.get(index))
        } else {
            None
        };

        let Some(bucket) = bucket else {
            trace!(length, "discarding block that matches no size class");
            return;
        };

        let mut retained = bucket.lock();

        if retained.len() < self.max_arrays_per_bucket {
            retained.push(block);
        } else {
            trace!(length, "size class is full, dropping block");
        }
    }
}

impl<T: Element> fmt::Debug for SharedArrayPool<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("max_array_length", &self.max_array_length)
            .field("max_arrays_per_bucket", &self.max_arrays_per_bucket)
            .field("retained", &self.retained())
            .finish()
    }
}

/// Builder for creating an instance of [`SharedArrayPool`].
///
/// Most code uses [`SharedArrayPool::shared()`]; a dedicated pool is useful to isolate a
/// component's memory from the rest of the process or to pool unusually large blocks.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use pooled_buffers::SharedArrayPool;
///
/// let pool = SharedArrayPool::<u8>::builder()
///     .max_array_length(NonZero::new(4 * 1024 * 1024).unwrap())
///     .max_arrays_per_bucket(NonZero::new(8).unwrap())
///     .build();
///
/// assert_eq!(pool.max_array_length(), 4 * 1024 * 1024);
/// assert_eq!(pool.max_arrays_per_bucket(), 8);
/// ```
#[must_use]
pub struct SharedArrayPoolBuilder<T: Element> {
    max_array_length: usize,
    max_arrays_per_bucket: usize,

    _element: PhantomData<fn() -> T>,
}

impl<T: Element> SharedArrayPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_arrays_per_bucket: DEFAULT_MAX_ARRAYS_PER_BUCKET,
            _element: PhantomData,
        }
    }

    /// Sets the longest block the pool retains for reuse.
    ///
    /// The value is rounded up to a power of two and to at least 16 elements.
    ///
    /// # Panics
    ///
    /// Panics if the rounded value does not fit in `usize`.
    #[inline]
    pub fn max_array_length(mut self, length: NonZero<usize>) -> Self {
        self.max_array_length = length
            .get()
            .max(MIN_ARRAY_LENGTH)
            .checked_next_power_of_two()
            .expect("maximum array length must fit in usize after rounding to a power of two");
        self
    }

    /// Sets how many blocks of each size class the pool retains.
    #[inline]
    pub fn max_arrays_per_bucket(mut self, count: NonZero<usize>) -> Self {
        self.max_arrays_per_bucket = count.get();
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    #[inline]
    pub fn build(self) -> SharedArrayPool<T> {
        SharedArrayPool::new_inner(self.max_array_length, self.max_arrays_per_bucket)
    }
}

impl<T: Element> fmt::Debug for SharedArrayPoolBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("max_array_length", &self.max_array_length)
            .field("max_arrays_per_bucket", &self.max_arrays_per_bucket)
            .finish()
    }
}
