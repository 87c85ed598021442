//! Provider identity and declared capabilities.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use quarry_core::OperatorId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Identity
// ============================================================================

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a provider instance.
///
/// Two sequences can be translated jointly only when they share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(u64);

impl ProviderId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

// ============================================================================
// Provider Capabilities
// ============================================================================

/// Operators a provider can execute natively.
///
/// This is a static declaration. The resolver trusts it; a provider that
/// declares an operator and then cannot run it reports `TranslationFailure`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCaps {
    /// Operators with a native translation.
    pub translatable: BTreeSet<OperatorId>,
    /// Provider has primitives that accept asynchronous predicates.
    pub async_callbacks: bool,
}

impl ProviderCaps {
    /// No capabilities (baseline): every operator is emulated.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every operator translates, including asynchronous predicates.
    pub fn all() -> Self {
        Self {
            translatable: OperatorId::ALL.into_iter().collect(),
            async_callbacks: true,
        }
    }

    /// Declare one more translatable operator.
    #[must_use]
    pub fn with_operator(mut self, op: OperatorId) -> Self {
        self.translatable.insert(op);
        self
    }

    /// Declare several translatable operators.
    #[must_use]
    pub fn with_operators(mut self, ops: impl IntoIterator<Item = OperatorId>) -> Self {
        self.translatable.extend(ops);
        self
    }

    /// Set whether asynchronous predicates are accepted natively.
    #[must_use]
    pub fn with_async_callbacks(mut self, enabled: bool) -> Self {
        self.async_callbacks = enabled;
        self
    }

    /// Whether the operator is declared translatable.
    pub fn translates(&self, op: OperatorId) -> bool {
        self.translatable.contains(&op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_ids_are_unique() {
        let a = ProviderId::next();
        let b = ProviderId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_caps_builders() {
        let caps = ProviderCaps::none()
            .with_operator(OperatorId::Any)
            .with_operators([OperatorId::Filter, OperatorId::Union]);

        assert!(caps.translates(OperatorId::Any));
        assert!(caps.translates(OperatorId::Union));
        assert!(!caps.translates(OperatorId::Reverse));
        assert!(!caps.async_callbacks);

        let all = ProviderCaps::all();
        assert!(OperatorId::ALL.iter().all(|op| all.translates(*op)));
        assert!(all.async_callbacks);
    }
}
