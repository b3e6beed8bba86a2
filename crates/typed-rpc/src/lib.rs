#![warn(missing_docs)]
//! # typed-rpc
//!
//! A typed RPC layer: procedures grouped into hierarchical routers, inputs
//! validated against declared schemas, executed against a per-request
//! context, and invoked from a client that batches calls into one round
//! trip while keeping each call's success or failure independent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ RpcClient                    │  calls from one tick -> one BatchRequest
//! │   Transport (HTTP / local)   │
//! └──────────────┬───────────────┘
//!                │ [{path, type, input}, ...]
//!                ▼
//! ┌──────────────────────────────┐
//! │ Dispatcher                   │  one ContextFactory call per request
//! │   Router::resolve            │  NotFound
//! │   kind check                 │  BadRequest
//! │   Schema::validate           │  BadRequest + fieldIssues
//! │   handler                    │  domain errors pass, the rest InternalError
//! └──────────────┬───────────────┘
//!                │ [{ok, data} | {ok, error}, ...]  index-aligned
//!                ▼
//!          each caller gets its own envelope
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use typed_rpc::prelude::*;
//!
//! async fn get_user(ctx: Context<AppContext>, input: UserIdInput) -> RpcResult<User> {
//!     ctx.store.user(input.id).await?.ok_or_else(|| RpcError::not_found("User not found"))
//! }
//!
//! let users = Router::builder()
//!     .procedure(
//!         "getById",
//!         procedure()
//!             .input(Schema::object().field("id", Schema::integer().min(1.0)))
//!             .query(get_user),
//!     )
//!     .build()?;
//! let app = router([("user", users)])?;
//!
//! let dispatcher = Arc::new(Dispatcher::new(app, AppContextFactory::new(store), RpcConfig::default())?);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! serve(listener, rpc_routes(dispatcher), shutdown_signal()).await?;
//! ```
//!
//! ## Error Codes
//!
//! | Code | Produced by |
//! |------|-------------|
//! | `NotFound` | resolution, or a handler |
//! | `BadRequest` | kind mismatch, schema violations, or a handler |
//! | `Conflict` | a handler |
//! | `PayloadTooLarge` | input or batch size limits |
//! | `InternalError` | context failure, any other handler failure, panics |
//! | `TransportError` | the client, when a round trip fails |

pub mod batch;
pub mod client;
mod config;
mod context;
pub mod contract;
mod dispatch;
mod error;
mod handler;
pub mod http;
pub mod logging;
pub mod procedure;
mod router;
pub mod schema;
pub mod validation;

#[cfg(test)]
mod tests;

// Public API
pub use batch::{BatchConfig, BatchMetrics, BatchRequest, BatchResponse, Call, Envelope};
pub use client::{HttpTransport, LocalTransport, MULTI_THREAD_SETTLE, RpcClient, Transport};
pub use config::{ClientConfig, ConfigValidationError, RpcConfig};
pub use context::{CloneContext, Context, ContextFactory, EmptyContext, FnContextFactory, context_fn};
pub use contract::{ProcedureContract, ProcedureRef, ProcedureSignature, RouterContract};
pub use dispatch::Dispatcher;
pub use error::{INTERNAL_ERROR_MESSAGE, RpcError, RpcErrorCode, RpcResult};
pub use handler::Handler;
pub use http::{rpc_routes, serve};
pub use logging::{LogConfig, LogLevel, RequestId};
pub use procedure::{Procedure, ProcedureBuilder, ProcedureKind, procedure};
pub use router::{Node, Router, RouterBuilder, RouterError, router};
pub use schema::{Schema, TypeSchema};
pub use validation::{FieldIssue, validate_input_size, validate_path};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use typed_rpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Batch processing
        BatchConfig,
        BatchRequest,
        BatchResponse,
        Call,
        // Client
        ClientConfig,
        // Context
        CloneContext,
        Context,
        ContextFactory,
        // Dispatch
        Dispatcher,
        EmptyContext,
        Envelope,
        // Validation
        FieldIssue,
        HttpTransport,
        LocalTransport,
        // Procedures
        ProcedureKind,
        ProcedureRef,
        // Router
        Router,
        RouterContract,
        RouterError,
        // Configuration
        RpcClient,
        RpcConfig,
        // Errors
        RpcError,
        RpcErrorCode,
        RpcResult,
        Schema,
        context_fn,
        procedure,
        router,
        rpc_routes,
        serve,
    };
}
