//! Predicate and selector callbacks.
//!
//! Callers hand the adapter one of three shapes:
//!
//! | Shape | Signature | Token |
//! |-------|-----------|-------|
//! | `Sync` | `Fn(&T) -> R` | none, runs inline |
//! | `AsyncNoToken` | `Fn(T) -> Future<R>` | withheld |
//! | `AsyncWithToken` | `Fn(T, CancellationToken) -> Future<R>` | passed through |
//!
//! The shape is the enum variant the caller built, so it is fixed before any
//! dispatch happens. [`NormalizedCallback::invoke`] is the one contract the
//! engine and providers call.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use futures::FutureExt;
use futures::future::{self, BoxFuture, Either};

/// Type-erased selector output.
pub type AnyValue = Box<dyn Any + Send>;

/// Synchronous callback.
pub type SyncFn<T, R> = Arc<dyn Fn(&T) -> R + Send + Sync>;

/// Asynchronous callback without a cancellation token.
pub type AsyncFn<T, R> = Arc<dyn Fn(T) -> BoxFuture<'static, R> + Send + Sync>;

/// Asynchronous callback receiving the ambient cancellation token.
pub type AsyncTokenFn<T, R> =
    Arc<dyn Fn(T, CancellationToken) -> BoxFuture<'static, R> + Send + Sync>;

/// Structural classification of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackShape {
    /// Runs synchronously and immediately.
    Sync,
    /// Awaited; never sees the cancellation token.
    AsyncNoToken,
    /// Awaited; receives the cancellation token.
    AsyncWithToken,
}

impl CallbackShape {
    /// Every shape, in declaration order.
    pub const ALL: [Self; 3] = [Self::Sync, Self::AsyncNoToken, Self::AsyncWithToken];

    /// Whether invoking this shape may suspend.
    pub const fn is_async(&self) -> bool {
        !matches!(self, Self::Sync)
    }
}

impl fmt::Display for CallbackShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sync => "sync",
            Self::AsyncNoToken => "async",
            Self::AsyncWithToken => "async+token",
        };
        f.write_str(name)
    }
}

/// A caller-supplied predicate or selector in one of three shapes.
pub enum Callback<T, R> {
    Sync(SyncFn<T, R>),
    Async(AsyncFn<T, R>),
    AsyncWithToken(AsyncTokenFn<T, R>),
}

/// Boolean callback.
pub type Predicate<T> = Callback<T, bool>;

impl<T, R> Clone for Callback<T, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Async(f) => Self::Async(Arc::clone(f)),
            Self::AsyncWithToken(f) => Self::AsyncWithToken(Arc::clone(f)),
        }
    }
}

impl<T, R> fmt::Debug for Callback<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({})", self.shape())
    }
}

impl<T, R> Callback<T, R> {
    /// Shape tag of this callback.
    pub const fn shape(&self) -> CallbackShape {
        match self {
            Self::Sync(_) => CallbackShape::Sync,
            Self::Async(_) => CallbackShape::AsyncNoToken,
            Self::AsyncWithToken(_) => CallbackShape::AsyncWithToken,
        }
    }
}

impl<T, R> Callback<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Wrap a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous function that takes no token.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::Async(Arc::new(move |element: T| f(element).boxed()))
    }

    /// Wrap an asynchronous function that observes the cancellation token.
    pub fn from_async_with_token<F, Fut>(f: F) -> Self
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::AsyncWithToken(Arc::new(move |element: T, token: CancellationToken| {
            f(element, token).boxed()
        }))
    }

    /// Map the outcome, keeping the shape.
    pub fn map_output<U, M>(self, map: M) -> Callback<T, U>
    where
        U: Send + 'static,
        M: Fn(R) -> U + Send + Sync + 'static,
    {
        let map = Arc::new(map);
        match self {
            Self::Sync(f) => Callback::Sync(Arc::new(move |element: &T| map(f(element)))),
            Self::Async(f) => Callback::Async(Arc::new(move |element: T| {
                let map = Arc::clone(&map);
                f(element).map(move |out| map(out)).boxed()
            })),
            Self::AsyncWithToken(f) => {
                Callback::AsyncWithToken(Arc::new(move |element: T, token: CancellationToken| {
                    let map = Arc::clone(&map);
                    f(element, token).map(move |out| map(out)).boxed()
                }))
            }
        }
    }
}

/// A callback bound to the canonical `(element, token) -> outcome` contract.
pub struct NormalizedCallback<T, R> {
    inner: Callback<T, R>,
}

impl<T, R> NormalizedCallback<T, R> {
    /// Bind a callback.
    pub const fn new(callback: Callback<T, R>) -> Self {
        Self { inner: callback }
    }

    /// Shape of the underlying callback.
    pub const fn shape(&self) -> CallbackShape {
        self.inner.shape()
    }

    /// The caller's own function, if the callback is synchronous.
    pub fn as_sync(&self) -> Option<&SyncFn<T, R>> {
        match &self.inner {
            Callback::Sync(f) => Some(f),
            _ => None,
        }
    }
}

impl<T, R> NormalizedCallback<T, R>
where
    T: Clone + Send + Sync,
    R: Send,
{
    /// Invoke the callback on one element.
    ///
    /// Synchronous callbacks complete without suspending. Asynchronous ones
    /// are raced against the token: cancellation fails the call with
    /// `OperationCanceled` as soon as it is requested, dropping the pending
    /// callback future.
    pub async fn invoke(&self, element: &T, cancel: &CancellationToken) -> QueryResult<R> {
        match &self.inner {
            Callback::Sync(f) => Ok(f(element)),
            Callback::Async(f) => {
                cancel.check()?;
                until_cancelled(f(element.clone()), cancel).await
            }
            Callback::AsyncWithToken(f) => {
                cancel.check()?;
                until_cancelled(f(element.clone(), cancel.clone()), cancel).await
            }
        }
    }
}

async fn until_cancelled<R>(
    callback: BoxFuture<'static, R>,
    cancel: &CancellationToken,
) -> QueryResult<R> {
    let cancelled = pin!(cancel.cancelled());
    match future::select(callback, cancelled).await {
        Either::Left((outcome, _)) => {
            cancel.check()?;
            Ok(outcome)
        }
        Either::Right(((), _)) => Err(QueryError::OperationCanceled),
    }
}

impl<T, R> Clone for NormalizedCallback<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, R> fmt::Debug for NormalizedCallback<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NormalizedCallback({})", self.shape())
    }
}
