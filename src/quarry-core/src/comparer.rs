//! Equality comparers for set operators.
//!
//! `distinct`, `union`, `intersect`, `except` and `contains` accept an
//! optional comparer. When none is supplied the element's intrinsic equality
//! from [`Element`] is used.

use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hasher};
use std::sync::Arc;

use crate::element::Element;

/// Equality comparer over elements of type `T`.
///
/// `hash_of` must agree with `equals`: equal elements hash equally.
pub trait ElementComparer<T>: Send + Sync {
    /// Whether two elements are equal.
    fn equals(&self, a: &T, b: &T) -> bool;

    /// Hash of an element.
    fn hash_of(&self, value: &T) -> u64;
}

/// Shared comparer handle.
pub type ComparerRef<T> = Arc<dyn ElementComparer<T>>;

/// Comparer backed by [`Element::default_eq`] and [`Element::default_hash`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl DefaultComparer {
    /// Shared handle to the default comparer for `T`.
    pub fn shared<T: Element>() -> ComparerRef<T> {
        Arc::new(Self)
    }

    /// The supplied comparer, or the default one.
    pub fn resolve<T: Element>(comparer: Option<&ComparerRef<T>>) -> ComparerRef<T> {
        comparer.map_or_else(Self::shared, Arc::clone)
    }
}

impl<T: Element> ElementComparer<T> for DefaultComparer {
    fn equals(&self, a: &T, b: &T) -> bool {
        a.default_eq(b)
    }

    fn hash_of(&self, value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.default_hash(&mut hasher);
        hasher.finish()
    }
}

/// Comparer built from a pair of closures.
pub struct FnComparer<T> {
    equals: Box<dyn Fn(&T, &T) -> bool + Send + Sync>,
    hash: Box<dyn Fn(&T) -> u64 + Send + Sync>,
}

impl<T: 'static> FnComparer<T> {
    /// Create a comparer from an equality and a compatible hash function.
    pub fn new<E, H>(equals: E, hash: H) -> Self
    where
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
        H: Fn(&T) -> u64 + Send + Sync + 'static,
    {
        Self {
            equals: Box::new(equals),
            hash: Box::new(hash),
        }
    }

    /// Wrap into a shared comparer handle.
    pub fn shared(self) -> ComparerRef<T> {
        Arc::new(self)
    }
}

impl<T> ElementComparer<T> for FnComparer<T> {
    fn equals(&self, a: &T, b: &T) -> bool {
        (self.equals)(a, b)
    }

    fn hash_of(&self, value: &T) -> u64 {
        (self.hash)(value)
    }
}

impl<T> fmt::Debug for FnComparer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComparer").finish_non_exhaustive()
    }
}

/// Set of elements under a comparer, remembering first occurrences.
///
/// Buckets by comparer hash and resolves collisions with `equals`, so any
/// comparer works without requiring `Eq + Hash` on `T`.
pub struct ElementSet<T> {
    comparer: ComparerRef<T>,
    buckets: HashMap<u64, Vec<T>>,
    len: usize,
}

impl<T> ElementSet<T> {
    /// Create an empty set.
    pub fn new(comparer: ComparerRef<T>) -> Self {
        Self {
            comparer,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// Whether an equal element is present.
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.comparer.hash_of(value);
        self.buckets
            .get(&hash)
            .is_some_and(|bucket| bucket.iter().any(|v| self.comparer.equals(v, value)))
    }

    /// Insert an element. Returns `false` if an equal element was present.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.comparer.hash_of(&value);
        let bucket = self.buckets.entry(hash).or_default();
        if bucket.iter().any(|v| self.comparer.equals(v, &value)) {
            return false;
        }
        bucket.push(value);
        self.len += 1;
        true
    }

    /// Number of distinct elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> fmt::Debug for ElementSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSet")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_insensitive() -> ComparerRef<String> {
        FnComparer::new(
            |a: &String, b: &String| a.eq_ignore_ascii_case(b),
            |s: &String| {
                let mut hasher = DefaultHasher::new();
                hasher.write(s.to_ascii_lowercase().as_bytes());
                hasher.finish()
            },
        )
        .shared()
    }

    #[test]
    fn test_default_comparer() {
        let comparer = DefaultComparer::shared::<i32>();
        assert!(comparer.equals(&3, &3));
        assert!(!comparer.equals(&3, &4));
        assert_eq!(comparer.hash_of(&3), comparer.hash_of(&3));
    }

    #[test]
    fn test_resolve_prefers_supplied() {
        let supplied = case_insensitive();
        let resolved = DefaultComparer::resolve(Some(&supplied));
        assert!(resolved.equals(&"ABC".to_string(), &"abc".to_string()));

        let fallback = DefaultComparer::resolve::<String>(None);
        assert!(!fallback.equals(&"ABC".to_string(), &"abc".to_string()));
    }

    #[test]
    fn test_element_set_first_occurrence() {
        let mut set = ElementSet::new(DefaultComparer::shared::<i32>());
        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_element_set_custom_comparer() {
        let mut set = ElementSet::new(case_insensitive());
        assert!(set.insert("Hello".to_string()));
        assert!(!set.insert("HELLO".to_string()));
        assert!(set.contains(&"hello".to_string()));
    }

    #[test]
    fn test_element_set_hash_collisions() {
        // Every element lands in one bucket; equality still separates them.
        let comparer = FnComparer::new(|a: &i32, b: &i32| a == b, |_| 7).shared();
        let mut set = ElementSet::new(comparer);
        for i in 0..10 {
            assert!(set.insert(i));
        }
        assert!(!set.insert(5));
        assert_eq!(set.len(), 10);
    }
}
