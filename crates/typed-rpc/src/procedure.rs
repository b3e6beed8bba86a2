//! Procedures and the procedure builder
//!
//! A [`Procedure`] pairs a [`ProcedureKind`], an input [`Schema`] and a
//! type-erased handler. It is built once at startup and never changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_rpc::prelude::*;
//!
//! let get_user = procedure::<AppContext>()
//!     .input(Schema::object().field("id", Schema::integer().min(1.0)))
//!     .describe("Fetch one user by id")
//!     .query(get_user_handler);
//!
//! let create_user = procedure::<AppContext>()
//!     .input(create_user_schema())
//!     .mutation(create_user_handler);
//! ```

use crate::handler::{ErasedHandler, Handler, erase};
use crate::schema::Schema;
use crate::{Context, RpcError, RpcResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use tracing::trace;

/// Whether a procedure reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Read-only; no side effects visible to other callers
    Query,
    /// May cause side effects
    Mutation,
}

impl ProcedureKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `BadRequest` for a call whose declared kind differs from the procedure's.
pub(crate) fn kind_mismatch(path: &str, declared: ProcedureKind, called: ProcedureKind) -> RpcError {
    RpcError::bad_request(format!(
        "Procedure '{}' is a {}, called as a {}",
        path, declared, called
    ))
}

// =============================================================================
// Procedure
// =============================================================================

/// A registered unit of work.
pub struct Procedure<Ctx: Send + Sync + 'static> {
    kind: ProcedureKind,
    input: Schema,
    handler: ErasedHandler<Ctx>,
    output_type: String,
    description: Option<String>,
}

impl<Ctx: Send + Sync + 'static> Clone for Procedure<Ctx> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            input: self.input.clone(),
            handler: self.handler.clone(),
            output_type: self.output_type.clone(),
            description: self.description.clone(),
        }
    }
}

impl<Ctx: Send + Sync + 'static> fmt::Debug for Procedure<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("output_type", &self.output_type)
            .finish_non_exhaustive()
    }
}

impl<Ctx: Send + Sync + 'static> Procedure<Ctx> {
    /// The declared kind.
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// The input schema.
    pub fn input_schema(&self) -> &Schema {
        &self.input
    }

    /// Short name of the handler's output type, e.g. `Option<User>`.
    pub fn output_type(&self) -> &str {
        &self.output_type
    }

    /// Optional description for the contract.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Run the input schema, mapping violations to `BadRequest`.
    pub fn validate(&self, raw: &serde_json::Value) -> RpcResult<serde_json::Value> {
        self.input.validate(raw).map_err(|issues| {
            trace!(issue_count = issues.len(), "Input rejected by schema");
            RpcError::invalid_input(issues)
        })
    }

    /// Run the handler on an already validated input.
    pub async fn execute(
        &self,
        ctx: Context<Ctx>,
        validated: serde_json::Value,
    ) -> RpcResult<serde_json::Value> {
        (self.handler)(ctx, validated).await
    }

    /// Validate then execute.
    pub async fn call(&self, ctx: Context<Ctx>, raw: serde_json::Value) -> RpcResult<serde_json::Value> {
        let validated = self.validate(&raw)?;
        self.execute(ctx, validated).await
    }
}

// =============================================================================
// Procedure Builder
// =============================================================================

/// Start building a procedure for context type `Ctx`.
pub fn procedure<Ctx: Send + Sync + 'static>() -> ProcedureBuilder<Ctx> {
    ProcedureBuilder::new()
}

/// Fluent builder: `.input(..)`, `.describe(..)`, then `.query(..)` or `.mutation(..)`.
///
/// Without `.input(..)` the procedure accepts no input (`null` or `{}`).
pub struct ProcedureBuilder<Ctx> {
    input: Schema,
    description: Option<String>,
    _ctx: PhantomData<fn() -> Ctx>,
}

impl<Ctx: Send + Sync + 'static> Default for ProcedureBuilder<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx: Send + Sync + 'static> ProcedureBuilder<Ctx> {
    /// New builder with no input.
    pub fn new() -> Self {
        Self {
            input: Schema::no_input(),
            description: None,
            _ctx: PhantomData,
        }
    }

    /// Set the input schema.
    #[must_use = "This method returns a new ProcedureBuilder and does not modify self"]
    pub fn input(mut self, schema: Schema) -> Self {
        self.input = schema;
        self
    }

    /// Set a description for the contract.
    #[must_use = "This method returns a new ProcedureBuilder and does not modify self"]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Finish as a query.
    pub fn query<Input, Output, H>(self, handler: H) -> Procedure<Ctx>
    where
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Ctx, Input, Output>,
    {
        self.finish(ProcedureKind::Query, handler)
    }

    /// Finish as a mutation.
    pub fn mutation<Input, Output, H>(self, handler: H) -> Procedure<Ctx>
    where
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Ctx, Input, Output>,
    {
        self.finish(ProcedureKind::Mutation, handler)
    }

    fn finish<Input, Output, H>(self, kind: ProcedureKind, handler: H) -> Procedure<Ctx>
    where
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Ctx, Input, Output>,
    {
        Procedure {
            kind,
            input: self.input,
            handler: erase(handler),
            output_type: short_type_name(std::any::type_name::<Output>()),
            description: self.description,
        }
    }
}

/// `alloc::vec::Vec<app::User>` becomes `Vec<User>`.
fn short_type_name(full: &str) -> String {
    fn push_last(out: &mut String, token: &str) {
        out.push_str(token.rsplit("::").next().unwrap_or(token));
    }

    let mut out = String::with_capacity(full.len());
    let mut token = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            token.push(ch);
        } else {
            push_last(&mut out, &token);
            token.clear();
            out.push(ch);
        }
    }
    push_last(&mut out, &token);
    out
}
