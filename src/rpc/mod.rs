//! Application RPC Module
//!
//! This module defines the RPC router, handlers, and types for the application.

pub mod api;
mod context;
mod handlers;
mod types;

pub use context::{AppContext, AppContextFactory};
pub use handlers::create_router;
pub use types::*;

use thiserror::Error;
use typed_rpc::{ConfigValidationError, Dispatcher, RouterError, RpcConfig};

/// Why the application could not be assembled.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("router composition failed: {0}")]
    Router(#[from] RouterError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),
    #[error("shared procedure references do not match the router: {}", describe(.0))]
    Contract(Vec<RouterError>),
}

fn describe(errors: &[RouterError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compose the router, check it against [`api::SIGNATURES`] and wrap it in a
/// dispatcher.
pub fn create_dispatcher(
    factory: AppContextFactory,
    config: RpcConfig,
) -> Result<Dispatcher<AppContext>, StartupError> {
    let dispatcher = Dispatcher::new(create_router()?, factory, config)?;
    dispatcher
        .verify(&api::SIGNATURES)
        .map_err(StartupError::Contract)?;
    Ok(dispatcher)
}
