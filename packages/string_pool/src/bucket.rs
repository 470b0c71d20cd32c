use std::num::NonZero;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// One independently locked partition of a [`StringPool`][crate::StringPool].
///
/// The slot storage is only allocated on the first write and is dropped again on
/// [`clear()`][Self::clear], while the lock itself lives as long as the bucket.
#[derive(Debug)]
pub(crate) struct Bucket {
    /// `None` until the first string is stored.
    slots: Mutex<Option<Box<[Option<Arc<str>>]>>>,

    slot_count: NonZero<usize>,
}

impl Bucket {
    pub(crate) fn new(slot_count: NonZero<usize>) -> Self {
        Self {
            slots: Mutex::new(None),
            slot_count,
        }
    }

    fn slot_index(&self, slot_hash: usize) -> usize {
        slot_hash % self.slot_count
    }

    /// Returns the cached string for `content` if its slot holds one with equal content.
    ///
    /// Otherwise stores the string produced by `materialize` in the slot, replacing whatever
    /// was there, and returns it. The lock is held for the whole decision.
    pub(crate) fn get_or_add(
        &self,
        content: &str,
        slot_hash: usize,
        materialize: impl FnOnce() -> Arc<str>,
    ) -> Arc<str> {
        let index = self.slot_index(slot_hash);
        let mut slots = self.slots.lock();

        let slot = slot_mut(&mut slots, index, self.slot_count);

        if let Some(cached) = slot.as_ref().filter(|cached| ***cached == *content) {
            return Arc::clone(cached);
        }

        let value = materialize();
        replace(slot, Arc::clone(&value), index);
        value
    }

    /// Stores `value` in its slot, replacing whatever was there.
    pub(crate) fn add(&self, value: Arc<str>, slot_hash: usize) {
        let index = self.slot_index(slot_hash);
        let mut slots = self.slots.lock();

        replace(slot_mut(&mut slots, index, self.slot_count), value, index);
    }

    pub(crate) fn try_get(&self, content: &str, slot_hash: usize) -> Option<Arc<str>> {
        let index = self.slot_index(slot_hash);
        let slots = self.slots.lock();

        slots
            .as_deref()
            .and_then(|slots| slots.get(index))
            .and_then(Option::as_ref)
            .filter(|cached| ***cached == *content)
            .map(Arc::clone)
    }

    /// Drops every stored string along with the slot storage.
    pub(crate) fn clear(&self) {
        *self.slots.lock() = None;
    }

    /// The number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .as_deref()
            .map_or(0, |slots| slots.iter().filter(|slot| slot.is_some()).count())
    }
}

/// Returns the slot at `index`, allocating the slot storage first if this is the first write.
#[expect(
    clippy::indexing_slicing,
    reason = "the index is reduced modulo the slot count"
)]
fn slot_mut(
    slots: &mut Option<Box<[Option<Arc<str>>]>>,
    index: usize,
    slot_count: NonZero<usize>,
) -> &mut Option<Arc<str>> {
    let slots = slots.get_or_insert_with(|| vec![None; slot_count.get()].into_boxed_slice());
    &mut slots[index]
}

fn replace(slot: &mut Option<Arc<str>>, value: Arc<str>, index: usize) {
    if let Some(evicted) = slot.replace(value) {
        trace!(
            slot = index,
            evicted_len = evicted.len(),
            "evicted interned string"
        );
    }
}
