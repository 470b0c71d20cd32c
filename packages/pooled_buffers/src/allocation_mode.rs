/// Determines what a newly allocated pool handle contains.
///
/// Blocks rented from a pool may have been used before, so by default their contents are
/// whatever the previous renter left behind.
///
/// # Example
///
/// ```
/// use pooled_buffers::{AllocationMode, MemoryOwner};
///
/// let owner = MemoryOwner::<u32>::allocate_with_mode(16, AllocationMode::Clear);
/// assert!(owner.span()?.iter().all(|value| *value == 0));
/// # Ok::<(), pooled_buffers::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum AllocationMode {
    /// The contents are unspecified. This is the default.
    #[default]
    Default,

    /// Every usable element is reset to `T::default()` before the handle is returned.
    Clear,
}
