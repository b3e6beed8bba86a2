//! Application context and its factory

use crate::digest::Digest;
use crate::store::Persistence;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;
use typed_rpc::{ContextFactory, RequestId, RpcError, RpcResult};

/// Per-request context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    /// Persistence handle, shared across requests
    pub store: Arc<dyn Persistence>,
    /// Applied to every secret before it is stored
    pub digest: Arc<dyn Digest>,
    /// Correlates the handler's log lines with one wire request
    pub request_id: RequestId,
}

/// Builds one [`AppContext`] per wire request.
///
/// Fails when the store reports itself unavailable, which fails every call
/// of that request.
#[derive(Clone)]
pub struct AppContextFactory {
    store: Arc<dyn Persistence>,
    digest: Arc<dyn Digest>,
}

impl AppContextFactory {
    pub fn new(store: impl Persistence, digest: impl Digest) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(digest))
    }

    pub fn from_shared(store: Arc<dyn Persistence>, digest: Arc<dyn Digest>) -> Self {
        Self { store, digest }
    }
}

#[async_trait]
impl ContextFactory<AppContext> for AppContextFactory {
    async fn create_context(&self) -> RpcResult<AppContext> {
        self.create_context_for_request(RequestId::new()).await
    }

    async fn create_context_for_request(&self, request_id: RequestId) -> RpcResult<AppContext> {
        if !self.store.is_available().await {
            return Err(RpcError::internal("Persistence backend unavailable"));
        }

        trace!(request_id = %request_id.short(), "App context created");
        Ok(AppContext {
            store: self.store.clone(),
            digest: self.digest.clone(),
            request_id,
        })
    }
}
