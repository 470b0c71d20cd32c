use std::hash::BuildHasher;

use foldhash::fast::FixedState;

// Fixed so that the same content always lands in the same bucket and slot.
const SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Clears the top bit so the hash is never negative when viewed as a signed value.
const SIGN_MASK: usize = usize::MAX >> 1;

/// Hashes string content for bucket and slot selection.
///
/// The content hash is masked to a non-negative value and mixed with the length, which keeps
/// strings of different lengths apart even when their content hashes collide in the low bits.
pub(crate) fn content_hash(content: &str) -> usize {
    let raw = FixedState::with_seed(SEED).hash_one(content);

    #[expect(
        clippy::cast_possible_truncation,
        reason = "only the low bits are needed for index selection"
    )]
    let raw = raw as usize;

    content.len() ^ (raw & SIGN_MASK)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_hash() {
        assert_eq!(content_hash("interned"), content_hash("interned"));
        assert_eq!(
            content_hash("interned"),
            content_hash(&(String::from("inter") + "ned"))
        );
    }

    #[test]
    fn top_bit_is_never_set() {
        for content in ["", "a", "ab", "a longer piece of text", "ünïcødé"] {
            assert_eq!(content_hash(content) & !SIGN_MASK, 0);
        }
    }

    #[test]
    fn different_content_usually_differs() {
        assert_ne!(content_hash("alpha"), content_hash("omega"));
    }
}
