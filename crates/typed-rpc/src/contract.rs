//! Router contracts and shared procedure references
//!
//! The contract is the one description of the API that both sides agree on.
//! It exists in two forms:
//!
//! - **Compile time**: [`ProcedureRef`] constants in a module shared by the
//!   server and its Rust clients. A client can only name procedures that the
//!   shared module declares, with the declared input and output types.
//! - **Run time**: [`RouterContract`], exported from a built router (and
//!   served over HTTP), listing each path with its kind, input schema and
//!   output type, plus a SHA-256 fingerprint of the whole shape.
//!
//! At startup the server calls [`RouterContract::verify`] with every shared
//! signature so a reference the router does not serve fails fast.
//!
//! ```rust,ignore
//! pub const USER_GET: ProcedureRef<GetUserInput, User> = ProcedureRef::query("user.getById");
//!
//! let user = client.call(&USER_GET, &GetUserInput { id: 1 }).await?;
//! ```

use crate::procedure::{ProcedureKind, kind_mismatch};
use crate::router::RouterError;
use crate::schema::TypeSchema;
use crate::{Procedure, RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Contract format version.
pub const CONTRACT_VERSION: &str = "1.0.0";

// =============================================================================
// Runtime Contract
// =============================================================================

/// Shape of one procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureContract {
    /// Query or mutation
    pub kind: ProcedureKind,
    /// Accepted input
    pub input: TypeSchema,
    /// Output type name
    pub output: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Shape of a whole router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterContract {
    /// Contract format version
    pub version: String,
    /// Hex SHA-256 over the serialized procedures
    pub fingerprint: String,
    /// Procedures by full dotted path
    pub procedures: BTreeMap<String, ProcedureContract>,
}

impl RouterContract {
    pub(crate) fn from_procedures<Ctx: Send + Sync + 'static>(
        procedures: Vec<(String, &Procedure<Ctx>)>,
    ) -> Self {
        let procedures: BTreeMap<_, _> = procedures
            .into_iter()
            .map(|(path, procedure)| {
                let contract = ProcedureContract {
                    kind: procedure.kind(),
                    input: procedure.input_schema().type_schema(),
                    output: procedure.output_type().to_string(),
                    description: procedure.description().map(str::to_string),
                };
                (path, contract)
            })
            .collect();

        Self {
            version: CONTRACT_VERSION.to_string(),
            fingerprint: fingerprint(&procedures),
            procedures,
        }
    }

    /// Look up one procedure.
    pub fn get(&self, path: &str) -> Option<&ProcedureContract> {
        self.procedures.get(path)
    }

    /// Whether `path` is served.
    pub fn contains(&self, path: &str) -> bool {
        self.procedures.contains_key(path)
    }

    /// Resolution and kind-check without a router, as the client sees it.
    pub fn check(&self, path: &str, kind: ProcedureKind) -> RpcResult<()> {
        let procedure = self
            .get(path)
            .ok_or_else(|| RpcError::procedure_not_found(path))?;
        if procedure.kind != kind {
            return Err(kind_mismatch(path, procedure.kind, kind));
        }
        Ok(())
    }

    /// Report every shared signature this contract does not serve.
    pub fn verify(&self, signatures: &[ProcedureSignature]) -> Result<(), Vec<RouterError>> {
        let problems: Vec<_> = signatures
            .iter()
            .filter_map(|signature| {
                let reason = match self.get(signature.path) {
                    None => "not served".to_string(),
                    Some(p) if p.kind != signature.kind => {
                        format!("served as {}, declared as {}", p.kind, signature.kind)
                    }
                    Some(_) => return None,
                };
                Some(RouterError::ContractMismatch {
                    path: signature.path.to_string(),
                    reason,
                })
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Convert to pretty-printed JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn fingerprint(procedures: &BTreeMap<String, ProcedureContract>) -> String {
    let bytes = serde_json::to_vec(procedures).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

// =============================================================================
// Shared References
// =============================================================================

/// Path and kind of a shared procedure, without its types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcedureSignature {
    /// Full dotted path
    pub path: &'static str,
    /// Declared kind
    pub kind: ProcedureKind,
}

/// Typed reference to a procedure taking `I` and returning `O`.
pub struct ProcedureRef<I, O> {
    signature: ProcedureSignature,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> ProcedureRef<I, O> {
    /// Reference to a query.
    pub const fn query(path: &'static str) -> Self {
        Self {
            signature: ProcedureSignature {
                path,
                kind: ProcedureKind::Query,
            },
            _types: PhantomData,
        }
    }

    /// Reference to a mutation.
    pub const fn mutation(path: &'static str) -> Self {
        Self {
            signature: ProcedureSignature {
                path,
                kind: ProcedureKind::Mutation,
            },
            _types: PhantomData,
        }
    }

    /// Full dotted path.
    pub const fn path(&self) -> &'static str {
        self.signature.path
    }

    /// Declared kind.
    pub const fn kind(&self) -> ProcedureKind {
        self.signature.kind
    }

    /// Type-erased signature for startup verification.
    pub const fn signature(&self) -> ProcedureSignature {
        self.signature
    }
}

impl<I, O> Clone for ProcedureRef<I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for ProcedureRef<I, O> {}

impl<I, O> fmt::Debug for ProcedureRef<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureRef")
            .field("path", &self.signature.path)
            .field("kind", &self.signature.kind)
            .finish()
    }
}
