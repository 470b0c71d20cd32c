#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A bounded, thread-safe cache that deduplicates repeated string content.
//!
//! Services that parse the same header names, field keys or enum-like values over and over
//! end up holding many identical strings. A [`StringPool`] hands out one shared [`Arc<str>`]
//! per distinct content instead, so repeated payloads cost one allocation.
//!
//! The pool is a fixed-size cache rather than a map: content hashes to a bucket and a slot
//! within it, and a string whose slot is taken replaces the previous occupant. Memory use is
//! therefore bounded no matter how much distinct content flows through.
//!
//! Content can be supplied as `&str`, as an existing `Arc<str>` or as raw bytes in one of the
//! supported [`TextEncoding`]s. Byte input is decoded through scratch memory rented from
//! [`pooled_buffers`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use string_pool::{StringPool, TextEncoding};
//!
//! let pool = StringPool::shared();
//!
//! let header = pool.get_or_add("accept-encoding");
//! let parsed = pool.get_or_add_bytes(b"accept-encoding", TextEncoding::Utf8);
//!
//! assert!(Arc::ptr_eq(&header, &parsed));
//! ```
//!
//! [`Arc<str>`]: std::sync::Arc

mod bucket;
mod encoding;
mod error;
mod hash;
mod pool;

pub(crate) use bucket::*;
pub(crate) use encoding::decode;
pub use encoding::TextEncoding;
pub use error::Error;
pub(crate) use error::Result;
pub(crate) use hash::*;
pub use pool::*;
