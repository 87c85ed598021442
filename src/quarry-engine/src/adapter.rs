//! The adapter façade.
//!
//! Every operator call passes through the same states:
//!
//! ```text
//! Validating → ShapeNormalized → Resolved{Translate|Emulate} → Executing → {Completed|Failed}
//! ```
//!
//! The first three run synchronously in [`AdapterHandle::prepare`], before
//! the cancellation token is inspected or any asynchronous work exists.
//! [`PreparedInvocation::run`] checks the token at entry and then executes
//! the chosen path. There is no retry and no fallback between paths.

use std::fmt;
use std::sync::Arc;

use log::trace;

use common_config::QuarryConfig;
use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::{Element, OperatorId};
use quarry_expr::QueryOutput;
use quarry_provider::QuerySource;

use crate::capability::{CapabilityPolicy, Decision, ExecutionPath, TranslationSupport, resolve};
use crate::emulation::emulate;
use crate::invocation::OperatorInvocation;
use crate::normalizer::{NormalizedInvocation, OperatorCallback, normalize};
use crate::queryable::AsyncQueryable;
use crate::rewriter::translate;

// ============================================================================
// Invocation State
// ============================================================================

/// State of one operator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Validating,
    ShapeNormalized,
    Resolved(ExecutionPath),
    Executing,
    Completed,
    Failed,
}

impl InvocationState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => f.write_str("Validating"),
            Self::ShapeNormalized => f.write_str("ShapeNormalized"),
            Self::Resolved(path) => write!(f, "Resolved({path})"),
            Self::Executing => f.write_str("Executing"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

fn transition(operator: OperatorId, state: InvocationState) {
    trace!("{operator}: {state}");
}

// ============================================================================
// Adapter Handle
// ============================================================================

/// Entry point for operator calls under one capability policy.
///
/// Read-only after construction: clones share the policy and concurrent
/// calls need no coordination.
#[derive(Debug, Clone, Default)]
pub struct AdapterHandle {
    policy: Arc<CapabilityPolicy>,
}

impl AdapterHandle {
    /// Create a handle with the given policy.
    pub fn new(policy: CapabilityPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Create a handle from configuration.
    pub fn from_config(config: &QuarryConfig) -> QueryResult<Self> {
        Ok(Self::new(CapabilityPolicy::from_config(&config.policy)?))
    }

    /// The active policy.
    pub fn policy(&self) -> &CapabilityPolicy {
        &self.policy
    }

    /// Typed operator methods over one source.
    pub fn queryable<T: Element>(&self, source: QuerySource<T>) -> AsyncQueryable<T> {
        AsyncQueryable::new(self.clone(), source)
    }

    /// Validate, normalize and resolve an invocation.
    ///
    /// Fails with `Argument` or `PolicyViolation` without touching the
    /// source or the provider.
    pub fn prepare<T: Element>(
        &self,
        invocation: OperatorInvocation<T>,
    ) -> QueryResult<PreparedInvocation<T>> {
        let operator = invocation.operator();
        let element_types = invocation.element_types();

        transition(operator, InvocationState::Validating);
        let normalized = normalize(invocation).inspect_err(|_| {
            transition(operator, InvocationState::Failed);
        })?;
        transition(operator, InvocationState::ShapeNormalized);

        let caps = normalized.source.provider().caps();
        let support = TranslationSupport {
            declared: caps.translates(operator),
            joint: normalized
                .second
                .as_ref()
                .is_none_or(|second| second.shares_provider(&normalized.source)),
            async_callbacks: caps.async_callbacks,
        };
        let shape = normalized.callback.as_ref().map(OperatorCallback::shape);
        let path = match resolve(operator, &element_types, shape, &self.policy, support) {
            Decision::Translate => ExecutionPath::Translate,
            Decision::Emulate => ExecutionPath::Emulate,
            Decision::Unsupported(reason) => {
                transition(operator, InvocationState::Failed);
                return Err(QueryError::policy_violation(operator.name(), reason));
            }
        };
        transition(operator, InvocationState::Resolved(path));

        Ok(PreparedInvocation {
            invocation: normalized,
            path,
        })
    }

    /// Prepare and run an invocation.
    pub async fn execute<T: Element>(
        &self,
        invocation: OperatorInvocation<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<T>> {
        self.prepare(invocation)?.run(cancel).await
    }

    /// Prepare and run an invocation on a fresh current-thread runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within a Tokio runtime, since the fresh
    /// runtime cannot block the thread that is already driving one. Use
    /// [`AdapterHandle::execute`] there instead.
    pub fn execute_blocking<T: Element>(
        &self,
        invocation: OperatorInvocation<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<T>> {
        let prepared = self.prepare(invocation)?;
        common_runtime::block_on(prepared.run(cancel))?
    }
}

// ============================================================================
// Prepared Invocation
// ============================================================================

/// An invocation that passed validation and resolution.
pub struct PreparedInvocation<T: Element> {
    invocation: NormalizedInvocation<T>,
    path: ExecutionPath,
}

impl<T: Element> PreparedInvocation<T> {
    /// Operator being invoked.
    pub fn operator(&self) -> OperatorId {
        self.invocation.operator
    }

    /// Chosen execution path.
    pub fn path(&self) -> ExecutionPath {
        self.path
    }

    /// Execute along the chosen path.
    ///
    /// An already-cancelled token fails with `OperationCanceled` before any
    /// provider or enumeration work.
    pub async fn run(self, cancel: &CancellationToken) -> QueryResult<QueryOutput<T>> {
        let operator = self.operator();
        if let Err(err) = cancel.check() {
            transition(operator, InvocationState::Failed);
            return Err(err);
        }

        transition(operator, InvocationState::Executing);
        let result = match self.path {
            ExecutionPath::Translate => translate(self.invocation, cancel).await,
            ExecutionPath::Emulate => emulate(self.invocation, cancel).await,
        };

        match &result {
            Ok(_) => transition(operator, InvocationState::Completed),
            Err(err) => {
                transition(operator, InvocationState::Failed);
                trace!("{operator}: {err}");
            }
        }
        result
    }
}

impl<T: Element> fmt::Debug for PreparedInvocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedInvocation")
            .field("operator", &self.invocation.operator)
            .field("source", &self.invocation.source)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
