//! Capability policy and translation failure handling.
//!
//! ## Test Categories
//!
//! 1. **Policy**: blanket and per-operator emulation allowances
//! 2. **Joint translation**: second sequences from another provider
//! 3. **Translation failures**: async callbacks, provider rejections,
//!    mismatched provider answers

use std::sync::Arc;

use async_trait::async_trait;

use common_config::QuarryConfig;
use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::OperatorId;
use quarry_engine::{AdapterHandle, CapabilityPolicy, OperatorInvocation};
use quarry_expr::{Callback, QueryExpr, QueryOutput, SourceRef};
use quarry_provider::{
    ElementStream, MemoryProvider, ProviderCaps, ProviderId, QueryProvider, QuerySource,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn memory(caps: ProviderCaps) -> Arc<MemoryProvider<i32>> {
    Arc::new(
        MemoryProvider::new("memory")
            .with_caps(caps)
            .with_collection("first", vec![1, 2, 2])
            .with_collection("second", vec![2, 3]),
    )
}

fn source(provider: &Arc<MemoryProvider<i32>>, name: &str) -> QuerySource<i32> {
    QuerySource::new(Arc::clone(provider) as Arc<dyn QueryProvider<i32>>, name)
}

/// Scans like a memory provider, declares every operator, executes none.
struct ScanOnlyProvider {
    inner: MemoryProvider<i32>,
    caps: ProviderCaps,
}

#[async_trait]
impl QueryProvider<i32> for ScanOnlyProvider {
    fn provider_id(&self) -> ProviderId {
        self.inner.provider_id()
    }

    fn name(&self) -> &str {
        "scan-only"
    }

    fn caps(&self) -> &ProviderCaps {
        &self.caps
    }

    async fn scan(
        &self,
        source: &SourceRef,
        cancel: &CancellationToken,
    ) -> QueryResult<ElementStream<i32>> {
        self.inner.scan(source, cancel).await
    }
}

/// Answers every translated query with `true`.
struct ConfusedProvider {
    id: ProviderId,
    caps: ProviderCaps,
}

#[async_trait]
impl QueryProvider<i32> for ConfusedProvider {
    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn name(&self) -> &str {
        "confused"
    }

    fn caps(&self) -> &ProviderCaps {
        &self.caps
    }

    async fn scan(
        &self,
        _source: &SourceRef,
        _cancel: &CancellationToken,
    ) -> QueryResult<ElementStream<i32>> {
        Ok(quarry_provider::empty_stream())
    }

    async fn execute(
        &self,
        _expr: QueryExpr<i32>,
        _cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<i32>> {
        Ok(QueryOutput::Bool(true))
    }
}

// ============================================================================
// Policy
// ============================================================================

#[tokio::test]
async fn test_disallow_all_without_translation() {
    let provider = memory(ProviderCaps::none());
    let handle = AdapterHandle::new(CapabilityPolicy::disallow_all());

    for operator in OperatorId::ALL {
        let invocation = OperatorInvocation::new(operator)
            .with_source(source(&provider, "first"))
            .with_second(source(&provider, "second"))
            .with_value(1);
        let invocation = if operator.callback_requirement().is_required() {
            match operator {
                OperatorId::Select => invocation.with_selector(Callback::sync(|x: &i32| {
                    Box::new(*x) as quarry_expr::AnyValue
                })),
                OperatorId::OrderBy | OperatorId::OrderByDescending => invocation
                    .with_key(Callback::sync(|x: &i32| quarry_core::SortKey::new(*x))),
                _ => invocation.with_predicate(Callback::sync(|_: &i32| true)),
            }
        } else {
            invocation
        };

        let err = handle
            .execute(invocation, &CancellationToken::none())
            .await
            .unwrap_err();
        let rejected = matches!(
            err,
            QueryError::PolicyViolation { operator: name, .. } if name == operator.name()
        );
        assert!(rejected, "{operator}: {err}");
    }

    let stats = provider.stats();
    assert_eq!((stats.scans, stats.executed), (0, 0));
}

#[tokio::test]
async fn test_disallow_all_with_translation() {
    let provider = memory(ProviderCaps::all());
    let handle = AdapterHandle::new(CapabilityPolicy::disallow_all());

    let union = handle
        .queryable(source(&provider, "first"))
        .union(&source(&provider, "second"), None, &CancellationToken::none())
        .await
        .unwrap();
    assert_eq!(union, vec![1, 2, 3]);
    assert_eq!(provider.stats().executed, 1);
}

#[tokio::test]
async fn test_per_operator_disallowance() {
    let provider = memory(ProviderCaps::none());
    let handle = AdapterHandle::new(
        CapabilityPolicy::permissive().with_operator(OperatorId::Reverse, false),
    );
    let first = handle.queryable(source(&provider, "first"));
    let token = CancellationToken::none();

    let err = first.reverse(&token).await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::PolicyViolation {
            operator: "reverse",
            ..
        }
    ));
    assert_eq!(first.distinct(None, &token).await.unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_blanket_flag_overrides_operator_allowance() {
    let provider = memory(ProviderCaps::none());
    let config = QuarryConfig::from_json_str(
        r#"{
            "policy": {
                "disallowAllEmulation": true,
                "perOperatorEmulationAllowed": { "count": true }
            }
        }"#,
    )
    .unwrap();
    let handle = AdapterHandle::from_config(&config).unwrap();

    let err = handle
        .queryable(source(&provider, "first"))
        .count(None, &CancellationToken::none())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::PolicyViolation { .. }));
}

#[test]
fn test_unknown_operator_in_config() {
    let config = QuarryConfig::from_json_str(
        r#"{ "policy": { "perOperatorEmulationAllowed": { "zip": false } } }"#,
    )
    .unwrap();
    let err = AdapterHandle::from_config(&config).unwrap_err();
    assert!(matches!(err, QueryError::InvalidConfiguration(_)));
}

// ============================================================================
// Joint Translation
// ============================================================================

#[tokio::test]
async fn test_foreign_second_sequence_is_emulated() {
    let home = memory(ProviderCaps::all());
    let away = memory(ProviderCaps::all());
    let handle = AdapterHandle::default();

    let union = handle
        .queryable(source(&home, "first"))
        .union(&source(&away, "second"), None, &CancellationToken::none())
        .await
        .unwrap();

    assert_eq!(union, vec![1, 2, 3]);
    assert_eq!(home.stats().executed, 0);
    assert_eq!(home.stats().scans, 1);
    assert_eq!(away.stats().scans, 1);
}

#[tokio::test]
async fn test_foreign_second_sequence_under_disallow_all() {
    let home = memory(ProviderCaps::all());
    let away = memory(ProviderCaps::all());
    let handle = AdapterHandle::new(CapabilityPolicy::disallow_all());

    let err = handle
        .queryable(source(&home, "first"))
        .intersect(&source(&away, "second"), None, &CancellationToken::none())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::PolicyViolation {
            operator: "intersect",
            ..
        }
    ));
    assert_eq!(home.stats().scans + away.stats().scans, 0);
}

// ============================================================================
// Translation Failures
// ============================================================================

#[tokio::test]
async fn test_async_predicate_without_async_primitive() {
    let provider = memory(ProviderCaps::all().with_async_callbacks(false));
    let handle = AdapterHandle::new(CapabilityPolicy::disallow_all());

    let err = handle
        .queryable(source(&provider, "first"))
        .any(
            Some(Callback::from_async(|x: i32| async move { x > 1 })),
            &CancellationToken::none(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::TranslationFailure { operator: "any", .. }
    ));
    assert_eq!(provider.stats().executed, 0);
    assert_eq!(provider.stats().scans, 0);
}

#[tokio::test]
async fn test_async_selector_follows_policy() {
    let provider = memory(ProviderCaps::all());
    let doubled = || Callback::from_async(|x: i32| async move { x * 2 });
    let token = CancellationToken::none();

    let emulated = AdapterHandle::default()
        .queryable(source(&provider, "first"))
        .select(doubled(), &token)
        .await
        .unwrap();
    assert_eq!(emulated, vec![2, 4, 4]);
    assert_eq!(provider.stats().executed, 0);

    let err = AdapterHandle::new(CapabilityPolicy::disallow_all())
        .queryable(source(&provider, "first"))
        .select(doubled(), &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::TranslationFailure {
            operator: "select",
            ..
        }
    ));
    assert_eq!(provider.stats().executed, 0);
    assert_eq!(provider.stats().scans, 1);
}

#[tokio::test]
async fn test_async_predicate_emulated_without_async_primitive() {
    let provider = memory(ProviderCaps::all().with_async_callbacks(false));

    let count = AdapterHandle::default()
        .queryable(source(&provider, "first"))
        .count(
            Some(Callback::from_async(|x: i32| async move { x == 2 })),
            &CancellationToken::none(),
        )
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(provider.stats().executed, 0);
    assert_eq!(provider.stats().scans, 1);
}

#[tokio::test]
async fn test_provider_without_native_execution() {
    let provider: Arc<dyn QueryProvider<i32>> = Arc::new(ScanOnlyProvider {
        inner: MemoryProvider::new("inner").with_collection("first", vec![1, 2]),
        caps: ProviderCaps::all(),
    });
    let handle = AdapterHandle::default();

    let err = handle
        .queryable(QuerySource::new(provider, "first"))
        .to_vec(&CancellationToken::none())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::TranslationFailure {
            operator: "to_vec",
            ..
        }
    ));
}

#[tokio::test]
async fn test_mismatched_provider_answer() {
    let provider: Arc<dyn QueryProvider<i32>> = Arc::new(ConfusedProvider {
        id: ProviderId::next(),
        caps: ProviderCaps::all(),
    });
    let handle = AdapterHandle::default();
    let queryable = handle.queryable(QuerySource::new(provider, "anything"));

    assert!(queryable.any(None, &CancellationToken::none()).await.unwrap());
    let err = queryable
        .count(None, &CancellationToken::none())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::TranslationFailure {
            operator: "count",
            ..
        }
    ));
}

#[tokio::test]
async fn test_provider_errors_pass_through() {
    let provider = Arc::new(
        MemoryProvider::new("flaky")
            .with_caps(ProviderCaps::all())
            .with_collection("first", vec![1, 2, 3])
            .with_failure_at("first", 1, "replica lost"),
    );
    let handle = AdapterHandle::default();

    let err = handle
        .queryable(source(&provider, "first"))
        .to_vec(&CancellationToken::none())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "ProviderError: replica lost");
}
