use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::{Bucket, Error, Result, TextEncoding, content_hash, decode};

/// The number of buckets in a pool created by [`StringPool::new()`].
pub const DEFAULT_BUCKET_COUNT: usize = 20;

/// The number of slots per bucket in a pool created by [`StringPool::new()`].
pub const DEFAULT_ENTRIES_PER_BUCKET: usize = 64;

static EMPTY: LazyLock<Arc<str>> = LazyLock::new(|| Arc::from(""));

static SHARED: LazyLock<StringPool> = LazyLock::new(StringPool::new);

/// A bounded, thread-safe cache that deduplicates repeated string content.
///
/// Looking up content that is already cached returns the cached [`Arc<str>`], so repeated
/// payloads share one allocation. The pool is a cache, not a dictionary: its capacity is fixed
/// at `bucket_count() * entries_per_bucket()` slots and a new string whose slot is taken simply
/// replaces the previous occupant. Lookups never fail; at worst they miss.
///
/// Each bucket has its own lock, so threads working on different buckets never contend.
///
/// Empty content always maps to one canonical empty string without touching any bucket.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use string_pool::StringPool;
///
/// let pool = StringPool::new();
///
/// let first = pool.get_or_add("content-type");
/// let second = pool.get_or_add(&String::from("content-type"));
///
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct StringPool {
    buckets: Box<[Bucket]>,

    bucket_count: NonZero<usize>,
    entries_per_bucket: NonZero<usize>,
}

impl StringPool {
    /// Creates a pool with [`DEFAULT_BUCKET_COUNT`] buckets of [`DEFAULT_ENTRIES_PER_BUCKET`]
    /// slots each.
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(
            NonZero::new(DEFAULT_BUCKET_COUNT).expect("default bucket count is not zero"),
            NonZero::new(DEFAULT_ENTRIES_PER_BUCKET).expect("default slot count is not zero"),
        )
    }

    /// Creates a pool with the given number of buckets and slots per bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if either dimension is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use string_pool::StringPool;
    ///
    /// let pool = StringPool::with_dimensions(4, 16)?;
    /// assert_eq!(pool.bucket_count(), 4);
    ///
    /// assert!(StringPool::with_dimensions(0, 16).is_err());
    /// # Ok::<(), string_pool::Error>(())
    /// ```
    pub fn with_dimensions(bucket_count: usize, entries_per_bucket: usize) -> Result<Self> {
        let bucket_count = NonZero::new(bucket_count).ok_or(Error::InvalidDimension {
            name: "bucket_count",
        })?;
        let entries_per_bucket = NonZero::new(entries_per_bucket).ok_or(Error::InvalidDimension {
            name: "entries_per_bucket",
        })?;

        Ok(Self::new_inner(bucket_count, entries_per_bucket))
    }

    /// The process-wide pool with default dimensions.
    #[must_use]
    #[inline]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    fn new_inner(bucket_count: NonZero<usize>, entries_per_bucket: NonZero<usize>) -> Self {
        // Every lock exists up front; only the slot storage is allocated lazily.
        let buckets = (0..bucket_count.get())
            .map(|_| Bucket::new(entries_per_bucket))
            .collect();

        Self {
            buckets,
            bucket_count,
            entries_per_bucket,
        }
    }

    /// Stores `value` in its slot, replacing whatever was there. Empty values are not stored.
    pub fn add(&self, value: impl Into<Arc<str>>) {
        let value = value.into();

        if value.is_empty() {
            return;
        }

        let (bucket, slot_hash) = self.bucket(content_hash(&value));
        bucket.add(value, slot_hash);
    }

    /// Returns the cached string with the same content as `content`, caching a new one if
    /// there is none.
    #[must_use]
    pub fn get_or_add(&self, content: &str) -> Arc<str> {
        self.get_or_add_with(content, || Arc::from(content))
    }

    /// Returns the cached string with the same content as `value`. If there is none, `value`
    /// itself is cached and returned.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use string_pool::StringPool;
    ///
    /// let pool = StringPool::new();
    /// let mine: Arc<str> = Arc::from("mine");
    ///
    /// let cached = pool.get_or_add_arc(Arc::clone(&mine));
    /// assert!(Arc::ptr_eq(&cached, &mine));
    /// ```
    #[must_use]
    pub fn get_or_add_arc(&self, value: Arc<str>) -> Arc<str> {
        self.get_or_add_with(&value, || Arc::clone(&value))
    }

    /// Decodes `bytes` and returns the cached string with the decoded content, caching a new
    /// one if there is none.
    ///
    /// Invalid input is decoded lossily, with U+FFFD REPLACEMENT CHARACTER in place of the
    /// invalid sequences.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use string_pool::{StringPool, TextEncoding};
    ///
    /// let pool = StringPool::new();
    ///
    /// let from_str = pool.get_or_add("hi");
    /// let from_utf16 = pool.get_or_add_bytes(&[b'h', 0, b'i', 0], TextEncoding::Utf16Le);
    ///
    /// assert!(Arc::ptr_eq(&from_str, &from_utf16));
    /// ```
    #[must_use]
    pub fn get_or_add_bytes(&self, bytes: &[u8], encoding: TextEncoding) -> Arc<str> {
        decode(bytes, encoding, |content| self.get_or_add(content))
    }

    /// Returns the cached string with the same content as `content`, if there is one.
    /// Never modifies the pool.
    #[must_use]
    pub fn try_get(&self, content: &str) -> Option<Arc<str>> {
        if content.is_empty() {
            return Some(empty());
        }

        let (bucket, slot_hash) = self.bucket(content_hash(content));
        bucket.try_get(content, slot_hash)
    }

    /// Drops every cached string.
    pub fn reset(&self) {
        for bucket in &self.buckets {
            bucket.clear();
        }

        debug!(
            bucket_count = self.bucket_count.get(),
            entries_per_bucket = self.entries_per_bucket.get(),
            "string pool reset"
        );
    }

    /// The number of independently locked buckets.
    #[must_use]
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.get()
    }

    /// The number of slots in each bucket.
    #[must_use]
    #[inline]
    pub fn entries_per_bucket(&self) -> usize {
        self.entries_per_bucket.get()
    }

    /// The number of cached strings.
    ///
    /// Other threads may change the pool while it is being counted, so the result is only a
    /// snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Whether no strings are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_add_with(&self, content: &str, materialize: impl FnOnce() -> Arc<str>) -> Arc<str> {
        if content.is_empty() {
            return empty();
        }

        let (bucket, slot_hash) = self.bucket(content_hash(content));
        bucket.get_or_add(content, slot_hash, materialize)
    }

    /// Picks the bucket for `hash` and returns it together with the hash bits left over for
    /// slot selection.
    ///
    /// The slot is chosen from the quotient rather than from `hash` itself, otherwise bucket
    /// and slot counts sharing a common factor would leave some slots of every bucket unused.
    #[expect(
        clippy::indexing_slicing,
        reason = "the index is reduced modulo the bucket count"
    )]
    fn bucket(&self, hash: usize) -> (&Bucket, usize) {
        (
            &self.buckets[hash % self.bucket_count],
            hash / self.bucket_count,
        )
    }
}

fn empty() -> Arc<str> {
    Arc::clone(&EMPTY)
}

impl Default for StringPool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringPool {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("bucket_count", &self.bucket_count)
            .field("entries_per_bucket", &self.entries_per_bucket)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(StringPool: Send, Sync, fmt::Debug, Default);

    #[test]
    fn default_dimensions() {
        let pool = StringPool::new();

        assert_eq!(pool.bucket_count(), 20);
        assert_eq!(pool.entries_per_bucket(), 64);
        assert!(pool.is_empty());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            StringPool::with_dimensions(0, 1),
            Err(Error::InvalidDimension {
                name: "bucket_count"
            })
        ));
        assert!(matches!(
            StringPool::with_dimensions(1, 0),
            Err(Error::InvalidDimension {
                name: "entries_per_bucket"
            })
        ));
    }

    #[test]
    fn repeated_lookup_returns_same_instance() {
        let pool = StringPool::new();

        let first = pool.get_or_add("abc");
        let second = pool.get_or_add("abc");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn single_slot_pool_evicts_previous_string() {
        let pool = StringPool::with_dimensions(1, 1).unwrap();

        let x = pool.get_or_add("x");
        let y = pool.get_or_add("y");

        assert_eq!(&*x, "x");
        assert_eq!(&*y, "y");
        assert_eq!(pool.try_get("x"), None);
        assert!(Arc::ptr_eq(&pool.try_get("y").unwrap(), &y));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn every_slot_is_reachable() {
        let pool = StringPool::new();

        for i in 0..100_000 {
            _ = pool.get_or_add(&format!("s{i}"));
        }

        assert_eq!(
            pool.len(),
            DEFAULT_BUCKET_COUNT * DEFAULT_ENTRIES_PER_BUCKET
        );
    }

    #[test]
    fn slots_are_chosen_independently_of_buckets() {
        // 4 buckets of 8 slots share a factor of 4 with each other.
        let pool = StringPool::with_dimensions(4, 8).unwrap();

        for i in 0..10_000 {
            _ = pool.get_or_add(&format!("key-{i}"));
        }

        assert_eq!(pool.len(), 32);
    }

    #[test]
    fn empty_content_is_canonical_and_not_stored() {
        let pool = StringPool::with_dimensions(1, 1).unwrap();

        let added = pool.get_or_add("");
        let found = pool.try_get("").unwrap();
        let from_bytes = pool.get_or_add_bytes(&[], TextEncoding::Utf16Be);
        pool.add("");

        assert!(Arc::ptr_eq(&added, &found));
        assert!(Arc::ptr_eq(&added, &from_bytes));
        assert!(Arc::ptr_eq(&added, &StringPool::shared().get_or_add("")));
        assert!(pool.is_empty());
    }

    #[test]
    fn try_get_does_not_add() {
        let pool = StringPool::new();

        assert_eq!(pool.try_get("missing"), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn add_then_try_get() {
        let pool = StringPool::new();
        let value: Arc<str> = Arc::from("stored");

        pool.add(Arc::clone(&value));

        assert!(Arc::ptr_eq(&pool.try_get("stored").unwrap(), &value));
    }

    #[test]
    fn add_accepts_owned_strings() {
        let pool = StringPool::new();

        pool.add(String::from("owned"));
        pool.add("borrowed");

        assert_eq!(pool.try_get("owned").as_deref(), Some("owned"));
        assert_eq!(pool.try_get("borrowed").as_deref(), Some("borrowed"));
    }

    #[test]
    fn get_or_add_arc_keeps_first_instance() {
        let pool = StringPool::new();
        let first: Arc<str> = Arc::from("shared");
        let second: Arc<str> = Arc::from("shared");

        let cached_first = pool.get_or_add_arc(Arc::clone(&first));
        let cached_second = pool.get_or_add_arc(second);

        assert!(Arc::ptr_eq(&cached_first, &first));
        assert!(Arc::ptr_eq(&cached_second, &first));
    }

    #[test]
    fn encoded_bytes_share_instance_with_str() {
        let pool = StringPool::new();
        let text = "naïve café";

        let from_str = pool.get_or_add(text);

        let utf8 = pool.get_or_add_bytes(text.as_bytes(), TextEncoding::Utf8);
        let utf16le = text.encode_utf16().flat_map(u16::to_le_bytes).collect::<Vec<_>>();
        let utf16be = text.encode_utf16().flat_map(u16::to_be_bytes).collect::<Vec<_>>();
        let latin1 = text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap())
            .collect::<Vec<_>>();

        assert!(Arc::ptr_eq(&from_str, &utf8));
        assert!(Arc::ptr_eq(
            &from_str,
            &pool.get_or_add_bytes(&utf16le, TextEncoding::Utf16Le)
        ));
        assert!(Arc::ptr_eq(
            &from_str,
            &pool.get_or_add_bytes(&utf16be, TextEncoding::Utf16Be)
        ));
        assert!(Arc::ptr_eq(
            &from_str,
            &pool.get_or_add_bytes(&latin1, TextEncoding::Latin1)
        ));
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let pool = StringPool::new();

        let value = pool.get_or_add_bytes(b"bad\xC3", TextEncoding::Utf8);

        assert_eq!(&*value, "bad\u{FFFD}");
    }

    #[test]
    fn reset_drops_everything() {
        let pool = StringPool::with_dimensions(3, 5).unwrap();

        for word in ["one", "two", "three", "four"] {
            _ = pool.get_or_add(word);
        }
        assert!(!pool.is_empty());

        let before = pool.get_or_add("one");
        pool.reset();

        assert!(pool.is_empty());
        assert_eq!(pool.try_get("one"), None);
        assert!(!Arc::ptr_eq(&before, &pool.get_or_add("one")));
    }

    #[test]
    fn shared_is_one_instance() {
        assert!(std::ptr::eq(StringPool::shared(), StringPool::shared()));
    }
}
