use thiserror::Error;

/// Errors that can occur when configuring a [`StringPool`][crate::StringPool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// One of the pool dimensions was zero.
    #[error("string pool dimension '{name}' must be greater than zero")]
    InvalidDimension {
        /// Name of the offending dimension.
        name: &'static str,
    },
}

/// A specialized `Result` type for string pool operations, returning the crate's [`Error`]
/// type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn invalid_dimension_names_the_dimension() {
        let error = Error::InvalidDimension { name: "buckets" };

        assert!(error.to_string().contains("buckets"));
    }
}
