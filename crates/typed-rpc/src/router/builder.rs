//! Router composition
//!
//! Both the fluent [`RouterBuilder`] and the [`router`] function collect
//! `(segment, node)` pairs and check them in one place.

use super::core::{Node, Router};
use crate::Procedure;
use crate::validation::segment_problem;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Startup-time composition failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RouterError {
    /// The same segment appears twice in one router
    #[error("duplicate segment '{segment}'")]
    DuplicateSegment {
        /// Offending segment
        segment: String,
    },
    /// A segment is empty or contains characters outside `[A-Za-z0-9_]`
    #[error("invalid segment '{segment}': {reason}")]
    InvalidSegment {
        /// Offending segment
        segment: String,
        /// What is wrong with it
        reason: String,
    },
    /// A shared procedure reference is not served by the router
    #[error("procedure '{path}' does not match the router: {reason}")]
    ContractMismatch {
        /// Path of the shared reference
        path: String,
        /// Missing, or served with another kind
        reason: String,
    },
}

/// Compose a router from `(segment, node)` pairs.
///
/// ```rust,ignore
/// let app = router([
///     ("health", Node::from(health())),
///     ("user", Node::from(user_router()?)),
/// ])?;
/// ```
pub fn router<Ctx, I, S, N>(entries: I) -> Result<Router<Ctx>, RouterError>
where
    Ctx: Send + Sync + 'static,
    I: IntoIterator<Item = (S, N)>,
    S: Into<String>,
    N: Into<Node<Ctx>>,
{
    entries
        .into_iter()
        .fold(RouterBuilder::new(), |builder, (segment, node)| {
            builder.entry(segment, node)
        })
        .build()
}

/// Fluent router composition.
pub struct RouterBuilder<Ctx: Send + Sync + 'static> {
    entries: Vec<(String, Node<Ctx>)>,
}

impl<Ctx: Send + Sync + 'static> Default for RouterBuilder<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx: Send + Sync + 'static> RouterBuilder<Ctx> {
    /// Empty builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add any node under `segment`.
    #[must_use = "This method returns a new RouterBuilder and does not modify self"]
    pub fn entry(mut self, segment: impl Into<String>, node: impl Into<Node<Ctx>>) -> Self {
        self.entries.push((segment.into(), node.into()));
        self
    }

    /// Add a procedure under `segment`.
    #[must_use = "This method returns a new RouterBuilder and does not modify self"]
    pub fn procedure(self, segment: impl Into<String>, procedure: Procedure<Ctx>) -> Self {
        self.entry(segment, procedure)
    }

    /// Nest a router under `segment`.
    #[must_use = "This method returns a new RouterBuilder and does not modify self"]
    pub fn nest(self, segment: impl Into<String>, router: Router<Ctx>) -> Self {
        self.entry(segment, router)
    }

    /// Check segments and freeze the router.
    pub fn build(self) -> Result<Router<Ctx>, RouterError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (segment, _) in &self.entries {
            if let Some(reason) = segment_problem(segment) {
                warn!(segment = %segment, reason = %reason, "Router composition rejected segment");
                return Err(RouterError::InvalidSegment {
                    segment: segment.clone(),
                    reason,
                });
            }
            if !seen.insert(segment.as_str()) {
                warn!(segment = %segment, "Router composition found duplicate segment");
                return Err(RouterError::DuplicateSegment {
                    segment: segment.clone(),
                });
            }
        }
        Ok(Router::from_entries(self.entries))
    }
}
