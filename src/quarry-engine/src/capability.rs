//! Capability resolution.
//!
//! Decides, per invocation, whether an operator is translated into the
//! provider or emulated client-side. The decision is a pure function of the
//! operator, the callback shape, the policy and the provider's declared
//! translation support, so it can be tested as a table without any backing
//! store.

use std::collections::BTreeMap;
use std::fmt;

use common_config::PolicyConfig;
use common_error::QueryResult;
use log::debug;
use quarry_core::{ElementType, OperatorId};
use quarry_expr::CallbackShape;

// ============================================================================
// Capability Policy
// ============================================================================

/// Which operators may be emulated.
///
/// Immutable once built. A blanket `disallow_all_emulation` takes precedence
/// over any per-operator allowance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityPolicy {
    disallow_all_emulation: bool,
    per_operator: BTreeMap<OperatorId, bool>,
}

impl CapabilityPolicy {
    /// Every operator may be emulated.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// No operator may be emulated.
    pub fn disallow_all() -> Self {
        Self {
            disallow_all_emulation: true,
            per_operator: BTreeMap::new(),
        }
    }

    /// Set the emulation allowance for one operator.
    #[must_use]
    pub fn with_operator(mut self, op: OperatorId, allowed: bool) -> Self {
        self.per_operator.insert(op, allowed);
        self
    }

    /// Build a policy from configuration, rejecting unknown operator names.
    pub fn from_config(config: &PolicyConfig) -> QueryResult<Self> {
        let per_operator = config
            .per_operator_emulation_allowed
            .iter()
            .map(|(name, allowed)| Ok((name.parse::<OperatorId>()?, *allowed)))
            .collect::<QueryResult<BTreeMap<_, _>>>()?;

        Ok(Self {
            disallow_all_emulation: config.disallow_all_emulation,
            per_operator,
        })
    }

    /// Whether the blanket flag is set.
    pub fn disallows_all_emulation(&self) -> bool {
        self.disallow_all_emulation
    }

    /// Whether `op` may be emulated.
    pub fn emulation_allowed(&self, op: OperatorId) -> bool {
        self.emulation_denial(op).is_none()
    }

    fn emulation_denial(&self, op: OperatorId) -> Option<&'static str> {
        if self.disallow_all_emulation {
            Some("emulation is disallowed for all operators")
        } else if self.per_operator.get(&op) == Some(&false) {
            Some("emulation is disallowed for this operator")
        } else {
            None
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Execution path for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    Translate,
    Emulate,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate => f.write_str("translate"),
            Self::Emulate => f.write_str("emulate"),
        }
    }
}

/// Outcome of capability resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Translate,
    Emulate,
    /// Neither path is eligible; carries the policy reason.
    Unsupported(String),
}

impl Decision {
    /// The chosen path, if any.
    pub fn path(&self) -> Option<ExecutionPath> {
        match self {
            Self::Translate => Some(ExecutionPath::Translate),
            Self::Emulate => Some(ExecutionPath::Emulate),
            Self::Unsupported(_) => None,
        }
    }
}

/// What the provider declared about translating one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationSupport {
    /// Operator is in the provider's declared capabilities.
    pub declared: bool,
    /// Every participating sequence belongs to that provider.
    pub joint: bool,
    /// Provider has a native primitive for asynchronous predicates.
    pub async_callbacks: bool,
}

impl TranslationSupport {
    /// Provider declares the operator, owns every sequence and runs
    /// asynchronous predicates.
    pub const fn available() -> Self {
        Self {
            declared: true,
            joint: true,
            async_callbacks: true,
        }
    }

    /// Provider does not translate the operator.
    pub const fn unavailable() -> Self {
        Self {
            declared: false,
            joint: true,
            async_callbacks: false,
        }
    }

    /// Whether the provider can take the operator at all.
    pub const fn is_available(&self) -> bool {
        self.declared && self.joint
    }

    /// Whether a callback of `shape` can travel with the translated query.
    ///
    /// Synchronous callbacks always can. Asynchronous predicates need the
    /// provider's primitive; selectors and ordering keys have none.
    pub fn accepts(&self, op: OperatorId, shape: Option<CallbackShape>) -> bool {
        match shape {
            None | Some(CallbackShape::Sync) => true,
            Some(_) => self.async_callbacks && !projects(op),
        }
    }

    fn shortfall(&self) -> &'static str {
        if self.declared {
            "the second sequence belongs to a different provider"
        } else {
            "the provider declares no translation"
        }
    }
}

/// Whether the operator's callback is a selector or ordering key.
pub(crate) fn projects(op: OperatorId) -> bool {
    matches!(
        op,
        OperatorId::Select | OperatorId::OrderBy | OperatorId::OrderByDescending
    )
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the execution path for one invocation.
///
/// Translate is preferred when the provider takes the operator and the
/// callback shape. Otherwise the operator is emulated if the policy allows
/// it. When emulation is denied but the provider takes the operator, the
/// decision stays Translate and the rewriter reports the callback it cannot
/// carry. `Unsupported` is left for operators the provider cannot take.
pub fn resolve(
    op: OperatorId,
    element_types: &[ElementType],
    shape: Option<CallbackShape>,
    policy: &CapabilityPolicy,
    translation: TranslationSupport,
) -> Decision {
    let decision = if translation.is_available() && translation.accepts(op, shape) {
        Decision::Translate
    } else {
        match policy.emulation_denial(op) {
            None => Decision::Emulate,
            Some(_) if translation.is_available() => Decision::Translate,
            Some(denial) => {
                Decision::Unsupported(format!("{denial} and {}", translation.shortfall()))
            }
        }
    };

    debug!(
        "Resolved {op} over [{}] with {} callback: {decision:?}",
        element_types
            .iter()
            .map(ElementType::name)
            .collect::<Vec<_>>()
            .join(", "),
        shape.map_or_else(|| "no".to_string(), |shape| shape.to_string())
    );
    decision
}
