//! Property tests: both execution paths agree with a synchronous reference.

use std::collections::HashSet;
use std::sync::Arc;

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use proptest::prelude::*;
use quarry_core::OperatorId;
use quarry_engine::{AdapterHandle, AsyncQueryable};
use quarry_expr::{Callback, CallbackShape};
use quarry_provider::{MemoryProvider, ProviderCaps, QueryProvider, QuerySource};

const DEFAULT: i32 = -1;
const PROBE: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Bool(bool),
    Count(usize),
    Element(i32),
    Sequence(Vec<i32>),
    Strings(Vec<String>),
    NoElements,
    MultipleElements,
}

impl<T> From<QueryResult<T>> for Outcome
where
    T: Into<Outcome>,
{
    fn from(result: QueryResult<T>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(QueryError::SequenceHasNoElements) => Self::NoElements,
            Err(QueryError::SequenceHasMultipleElements) => Self::MultipleElements,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<usize> for Outcome {
    fn from(value: usize) -> Self {
        Self::Count(value)
    }
}

impl From<i32> for Outcome {
    fn from(value: i32) -> Self {
        Self::Element(value)
    }
}

impl From<Vec<i32>> for Outcome {
    fn from(value: Vec<i32>) -> Self {
        Self::Sequence(value)
    }
}

impl From<Vec<String>> for Outcome {
    fn from(value: Vec<String>) -> Self {
        Self::Strings(value)
    }
}

fn qualifies(x: &i32) -> bool {
    x % 3 == 0
}

fn order_key(x: &i32) -> i32 {
    x % 4
}

fn label(x: &i32) -> String {
    x.to_string()
}

fn shaped<R: Send + 'static>(shape: CallbackShape, f: fn(&i32) -> R) -> Callback<i32, R> {
    match shape {
        CallbackShape::Sync => Callback::sync(f),
        CallbackShape::AsyncNoToken => Callback::from_async(move |x: i32| async move { f(&x) }),
        CallbackShape::AsyncWithToken => {
            Callback::from_async_with_token(move |x: i32, _token: CancellationToken| async move {
                f(&x)
            })
        }
    }
}

fn distinct_in_order(elements: impl IntoIterator<Item = i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    elements.into_iter().filter(|x| seen.insert(*x)).collect()
}

fn extract_single(matches: &[i32], default: Option<i32>) -> Outcome {
    match (matches, default) {
        ([], Some(default)) => Outcome::Element(default),
        ([], None) => Outcome::NoElements,
        ([only], _) => Outcome::Element(*only),
        _ => Outcome::MultipleElements,
    }
}

/// What the operator must produce, computed with std iterators.
fn reference(operator: OperatorId, xs: &[i32], ys: &[i32], use_predicate: bool) -> Outcome {
    let matches: Vec<i32> = xs
        .iter()
        .copied()
        .filter(|x| !use_predicate || qualifies(x))
        .collect();
    let in_ys: HashSet<i32> = ys.iter().copied().collect();

    match operator {
        OperatorId::Any => Outcome::Bool(!matches.is_empty()),
        OperatorId::All => Outcome::Bool(xs.iter().all(qualifies)),
        OperatorId::Count => Outcome::Count(matches.len()),
        OperatorId::Contains => Outcome::Bool(xs.contains(&PROBE)),
        OperatorId::First => matches.first().map_or(Outcome::NoElements, |x| Outcome::Element(*x)),
        OperatorId::FirstOrDefault => Outcome::Element(matches.first().copied().unwrap_or(DEFAULT)),
        OperatorId::Last => matches.last().map_or(Outcome::NoElements, |x| Outcome::Element(*x)),
        OperatorId::LastOrDefault => Outcome::Element(matches.last().copied().unwrap_or(DEFAULT)),
        OperatorId::Single => extract_single(&matches, None),
        OperatorId::SingleOrDefault => extract_single(&matches, Some(DEFAULT)),
        OperatorId::DefaultIfEmpty if xs.is_empty() => Outcome::Sequence(vec![DEFAULT]),
        OperatorId::DefaultIfEmpty | OperatorId::ToVec => Outcome::Sequence(xs.to_vec()),
        OperatorId::Distinct => Outcome::Sequence(distinct_in_order(xs.iter().copied())),
        OperatorId::Reverse => Outcome::Sequence(xs.iter().rev().copied().collect()),
        OperatorId::Union => {
            Outcome::Sequence(distinct_in_order(xs.iter().chain(ys).copied()))
        }
        OperatorId::Intersect => Outcome::Sequence(distinct_in_order(
            xs.iter().copied().filter(|x| in_ys.contains(x)),
        )),
        OperatorId::Except => Outcome::Sequence(distinct_in_order(
            xs.iter().copied().filter(|x| !in_ys.contains(x)),
        )),
        OperatorId::Filter => Outcome::Sequence(xs.iter().copied().filter(qualifies).collect()),
        OperatorId::Select => Outcome::Strings(xs.iter().map(label).collect()),
        OperatorId::OrderBy => {
            let mut sorted = xs.to_vec();
            sorted.sort_by_key(order_key);
            Outcome::Sequence(sorted)
        }
        OperatorId::OrderByDescending => {
            let mut sorted = xs.to_vec();
            sorted.sort_by(|a, b| order_key(b).cmp(&order_key(a)));
            Outcome::Sequence(sorted)
        }
    }
}

async fn observe(
    xs: &AsyncQueryable<i32>,
    ys: &QuerySource<i32>,
    operator: OperatorId,
    shape: CallbackShape,
    use_predicate: bool,
) -> Outcome {
    let token = CancellationToken::none();
    let predicate = || use_predicate.then(|| shaped(shape, qualifies));

    match operator {
        OperatorId::Any => xs.any(predicate(), &token).await.into(),
        OperatorId::All => xs.all(shaped(shape, qualifies), &token).await.into(),
        OperatorId::Count => xs.count(predicate(), &token).await.into(),
        OperatorId::Contains => xs.contains(PROBE, None, &token).await.into(),
        OperatorId::First => xs.first(predicate(), &token).await.into(),
        OperatorId::FirstOrDefault => xs
            .first_or_default(predicate(), Some(DEFAULT), &token)
            .await
            .into(),
        OperatorId::Last => xs.last(predicate(), &token).await.into(),
        OperatorId::LastOrDefault => xs
            .last_or_default(predicate(), Some(DEFAULT), &token)
            .await
            .into(),
        OperatorId::Single => xs.single(predicate(), &token).await.into(),
        OperatorId::SingleOrDefault => xs
            .single_or_default(predicate(), Some(DEFAULT), &token)
            .await
            .into(),
        OperatorId::DefaultIfEmpty => xs.default_if_empty(Some(DEFAULT), &token).await.into(),
        OperatorId::Distinct => xs.distinct(None, &token).await.into(),
        OperatorId::Reverse => xs.reverse(&token).await.into(),
        OperatorId::Union => xs.union(ys, None, &token).await.into(),
        OperatorId::Intersect => xs.intersect(ys, None, &token).await.into(),
        OperatorId::Except => xs.except(ys, None, &token).await.into(),
        OperatorId::Filter => xs.filter(shaped(shape, qualifies), &token).await.into(),
        OperatorId::Select => xs.select(shaped(shape, label), &token).await.into(),
        OperatorId::OrderBy => xs.order_by(shaped(shape, order_key), &token).await.into(),
        OperatorId::OrderByDescending => xs
            .order_by_descending(shaped(shape, order_key), &token)
            .await
            .into(),
        OperatorId::ToVec => xs.to_vec(&token).await.into(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn paths_agree_with_reference(
        xs in prop::collection::vec(0..10i32, 0..12),
        ys in prop::collection::vec(0..10i32, 0..12),
        operator in prop::sample::select(OperatorId::ALL.to_vec()),
        shape in prop::sample::select(CallbackShape::ALL.to_vec()),
        translate in any::<bool>(),
        use_predicate in any::<bool>(),
    ) {
        let caps = if translate { ProviderCaps::all() } else { ProviderCaps::none() };
        let provider: Arc<dyn QueryProvider<i32>> = Arc::new(
            MemoryProvider::new("props")
                .with_caps(caps)
                .with_collection("xs", xs.clone())
                .with_collection("ys", ys.clone()),
        );
        let handle = AdapterHandle::default();
        let queryable = handle.queryable(QuerySource::new(Arc::clone(&provider), "xs"));
        let second = QuerySource::new(provider, "ys");

        let observed = common_runtime::block_on(observe(
            &queryable,
            &second,
            operator,
            shape,
            use_predicate,
        ))
        .unwrap();

        let expected = reference(operator, &xs, &ys, use_predicate);
        prop_assert_eq!(observed, expected);
    }
}
