use std::ops::Deref;
use std::sync::Arc;

use crate::{ArrayPool, Element, SharedArrayPool};

/// The pool that a handle or writer rented its block from and must give it back to.
///
/// The process-wide pools are referenced directly, so handles created through the default
/// constructors do not touch any reference count.
#[derive(Debug)]
pub(crate) enum PoolRef<T: Element> {
    Shared(&'static SharedArrayPool<T>),
    Custom(Arc<dyn ArrayPool<T>>),
}

impl<T: Element> PoolRef<T> {
    pub(crate) fn shared() -> Self {
        Self::Shared(SharedArrayPool::shared())
    }
}

impl<T: Element> Deref for PoolRef<T> {
    type Target = dyn ArrayPool<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Shared(pool) => *pool,
            Self::Custom(pool) => pool.as_ref(),
        }
    }
}

impl<T: Element> From<Arc<dyn ArrayPool<T>>> for PoolRef<T> {
    #[inline]
    fn from(pool: Arc<dyn ArrayPool<T>>) -> Self {
        Self::Custom(pool)
    }
}
