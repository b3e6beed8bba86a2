//! Per-request context and its factory
//!
//! A [`ContextFactory`] runs once per incoming wire request. The value it
//! builds is wrapped in a [`Context`] and shared by every call of that one
//! batch, then dropped with the response. Nothing is cached across requests.

use crate::RpcResult;
use crate::logging::RequestId;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Context wrapper handed to every handler of one wire request.
///
/// Cloning is cheap; all calls of a batch see the same value.
pub struct Context<T: Send + Sync + 'static> {
    inner: Arc<T>,
}

impl<T: Send + Sync + 'static> Context<T> {
    /// Create a new context wrapping the given value
    pub fn new(ctx: T) -> Self {
        Self {
            inner: Arc::new(ctx),
        }
    }

    /// Get a reference to the inner context
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get the Arc for sharing
    pub fn arc(&self) -> Arc<T> {
        self.inner.clone()
    }
}

impl<T: Send + Sync + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> std::ops::Deref for Context<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Empty context for routers that don't need state
#[derive(Clone, Default, Debug)]
pub struct EmptyContext;

// =============================================================================
// Context Factory
// =============================================================================

/// Builds the context for one incoming wire request.
///
/// An error here fails every call of that request with `InternalError`.
#[async_trait]
pub trait ContextFactory<Ctx>: Send + Sync + 'static
where
    Ctx: Send + Sync + 'static,
{
    /// Construct a fresh context.
    async fn create_context(&self) -> RpcResult<Ctx>;

    /// Construct the context for the wire request logged as `request_id`.
    ///
    /// The dispatcher always calls this one. Override it to carry the id
    /// into the context.
    async fn create_context_for_request(&self, request_id: RequestId) -> RpcResult<Ctx> {
        let _ = request_id;
        self.create_context().await
    }
}

/// Factory backed by an async closure.
///
/// ```rust,ignore
/// let factory = context_fn(move || {
///     let store = store.clone();
///     async move { Ok(AppContext::new(store)) }
/// });
/// ```
pub struct FnContextFactory<F> {
    f: F,
}

/// Wrap an async closure as a [`ContextFactory`].
pub fn context_fn<F>(f: F) -> FnContextFactory<F> {
    FnContextFactory { f }
}

#[async_trait]
impl<Ctx, F, Fut> ContextFactory<Ctx> for FnContextFactory<F>
where
    Ctx: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Ctx>> + Send,
{
    async fn create_context(&self) -> RpcResult<Ctx> {
        (self.f)().await
    }
}

/// Factory that hands out a clone of a prepared value.
#[derive(Clone, Debug, Default)]
pub struct CloneContext<Ctx> {
    value: Ctx,
}

impl<Ctx> CloneContext<Ctx> {
    /// Use clones of `value` as the per-request context.
    pub fn new(value: Ctx) -> Self {
        Self { value }
    }
}

#[async_trait]
impl<Ctx> ContextFactory<Ctx> for CloneContext<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    async fn create_context(&self) -> RpcResult<Ctx> {
        Ok(self.value.clone())
    }
}
