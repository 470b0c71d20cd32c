use std::any::type_name;

use thiserror::Error;

/// Errors that can occur when working with pooled memory handles and buffer writers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The handle or writer has already returned its memory to the pool.
    #[error("cannot access {type_name} after it has been disposed")]
    Disposed {
        /// Name of the type that was accessed after disposal.
        type_name: &'static str,
    },

    /// The caller provided an argument outside the range accepted by the operation.
    #[error("invalid argument '{name}': {problem}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// A fixed-size destination cannot hold the requested number of elements.
    #[error("requested room for {requested} elements but only {available} are available")]
    CapacityExceeded {
        /// Number of elements the caller asked for.
        requested: usize,

        /// Number of elements the destination can still hold.
        available: usize,
    },

    /// Advancing the write cursor would move it past the end of the buffer.
    #[error("cannot advance the write cursor by {count}: only {available} elements are free")]
    AdvanceOverrun {
        /// Number of elements the caller attempted to advance by.
        count: usize,

        /// Number of elements that were free at the time of the call.
        available: usize,
    },
}

impl Error {
    pub(crate) fn disposed<T: ?Sized>() -> Self {
        Self::Disposed {
            type_name: type_name::<T>(),
        }
    }
}

/// A specialized `Result` type for pooled buffer operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
