#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Pooled memory handles and buffer writers that rent their storage from a shared array pool.
//!
//! Allocating and freeing short-lived buffers on hot paths is expensive. This package lets code
//! rent blocks of memory from an [`ArrayPool`] instead and give them back when done, so the
//! same allocations are reused over and over.
//!
//! # Key types
//!
//! - [`SharedArrayPool`]: the default pool, with one process-wide instance per element type
//!   available via [`SharedArrayPool::shared()`].
//! - [`MemoryOwner`]: exclusive ownership of a rented block with an exact usable length. Can be
//!   stored, moved between threads and disposed explicitly.
//! - [`SpanOwner`]: the scoped, thread-bound counterpart of [`MemoryOwner`] for temporary
//!   buffers. Dereferences directly to a slice.
//! - [`ArrayPoolBufferWriter`]: a growable [`BufferWriter`] backed by pooled blocks.
//! - [`MemoryBufferWriter`]: a fixed-capacity [`BufferWriter`] over a caller-supplied slice.
//!
//! Pooled blocks hold [`Element`] values: plain `Copy + Default` data. A block rented from a pool
//! may have been used before, so its contents are unspecified unless it is allocated with
//! [`AllocationMode::Clear`].
//!
//! # Example
//!
//! ```
//! use pooled_buffers::{ArrayPoolBufferWriter, BufferWriter, SpanOwner};
//!
//! let mut writer = ArrayPoolBufferWriter::<u8>::new();
//!
//! for word in ["pooled", " ", "memory"] {
//!     writer.write(word.as_bytes())?;
//! }
//!
//! // Scratch space that goes back to the pool at the end of the scope.
//! let mut scratch = SpanOwner::<u8>::allocate(writer.written_count());
//! scratch.copy_from_slice(writer.written_span()?);
//! scratch.make_ascii_uppercase();
//!
//! assert_eq!(&*scratch, b"POOLED MEMORY");
//! # Ok::<(), pooled_buffers::Error>(())
//! ```

mod allocation_mode;
mod array_pool;
mod array_pool_buffer_writer;
mod buffer_writer;
mod error;
mod memory_buffer_writer;
mod memory_owner;
mod pool_ref;
mod shared_pool;
mod span_owner;

pub use allocation_mode::*;
pub use array_pool::*;
pub use array_pool_buffer_writer::*;
pub use buffer_writer::*;
pub use error::Error;
pub(crate) use error::Result;
pub use memory_buffer_writer::*;
pub use memory_owner::*;
pub(crate) use pool_ref::*;
pub use shared_pool::*;
pub use span_owner::*;
