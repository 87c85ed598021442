//! Type-erased ordering keys.
//!
//! `order_by` key selectors return any `K: Ord`. Erasing `K` into a
//! [`SortKey`] lets one invocation type and one provider trait carry keys of
//! every type.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

trait ErasedKey: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn cmp_erased(&self, other: &dyn ErasedKey) -> Ordering;
}

impl<K> ErasedKey for K
where
    K: Ord + Send + Sync + fmt::Debug + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn cmp_erased(&self, other: &dyn ErasedKey) -> Ordering {
        // Keys of one sort always come from one selector, so types agree.
        other
            .as_any()
            .downcast_ref::<K>()
            .map_or(Ordering::Equal, |other| self.cmp(other))
    }
}

/// An ordering key of erased type.
pub struct SortKey(Box<dyn ErasedKey>);

impl SortKey {
    /// Erase a key.
    pub fn new<K>(key: K) -> Self
    where
        K: Ord + Send + Sync + fmt::Debug + 'static,
    {
        Self(Box::new(key))
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SortKey").field(&self.0).finish()
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self.0).cmp_erased(&*other.0)
    }
}
