//! Router tree and path resolution

use super::builder::RouterBuilder;
use crate::contract::RouterContract;
use crate::validation::validate_path;
use crate::{Procedure, RpcError, RpcResult};
use std::collections::HashMap;

/// One child of a router.
pub enum Node<Ctx: Send + Sync + 'static> {
    /// A nested namespace
    Router(Router<Ctx>),
    /// A callable leaf
    Procedure(Procedure<Ctx>),
}

impl<Ctx: Send + Sync + 'static> From<Router<Ctx>> for Node<Ctx> {
    fn from(router: Router<Ctx>) -> Self {
        Self::Router(router)
    }
}

impl<Ctx: Send + Sync + 'static> From<Procedure<Ctx>> for Node<Ctx> {
    fn from(procedure: Procedure<Ctx>) -> Self {
        Self::Procedure(procedure)
    }
}

/// Ordered, immutable tree of procedures.
pub struct Router<Ctx: Send + Sync + 'static> {
    entries: Vec<(String, Node<Ctx>)>,
    index: HashMap<String, usize>,
}

impl<Ctx: Send + Sync + 'static> Router<Ctx> {
    /// Start composing a router.
    pub fn builder() -> RouterBuilder<Ctx> {
        RouterBuilder::new()
    }

    /// Called by the builder once segments are known to be valid and unique.
    pub(super) fn from_entries(entries: Vec<(String, Node<Ctx>)>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (segment, _))| (segment.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Direct child by segment.
    pub fn get(&self, segment: &str) -> Option<&Node<Ctx>> {
        self.index.get(segment).map(|&i| &self.entries[i].1)
    }

    /// Direct children in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node<Ctx>)> {
        self.entries.iter().map(|(segment, node)| (segment.as_str(), node))
    }

    /// Resolve a dotted path to a procedure.
    ///
    /// Fails with `NotFound` when a segment is missing, when the path walks
    /// through a procedure, or when it ends on a router.
    pub fn resolve(&self, path: &str) -> RpcResult<&Procedure<Ctx>> {
        validate_path(path)?;

        let mut router = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let node = router.get(segment).ok_or_else(|| {
                tracing::debug!(path = %path, segment = %segment, "Procedure not found");
                RpcError::procedure_not_found(path)
            })?;

            match (node, segments.peek()) {
                (Node::Procedure(procedure), None) => return Ok(procedure),
                (Node::Router(nested), Some(_)) => router = nested,
                (Node::Procedure(_), Some(_)) => {
                    return Err(RpcError::procedure_not_found(path)
                        .with_cause(format!("'{}' is a procedure, not a router", segment)));
                }
                (Node::Router(_), None) => {
                    return Err(RpcError::not_found(format!(
                        "'{}' is a router, not a procedure",
                        path
                    )));
                }
            }
        }

        Err(RpcError::procedure_not_found(path))
    }

    /// Every procedure with its full path, depth-first in insertion order.
    pub fn procedures(&self) -> Vec<(String, &Procedure<Ctx>)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Procedure<Ctx>)>) {
        for (segment, node) in &self.entries {
            let path = if prefix.is_empty() {
                segment.clone()
            } else {
                format!("{}.{}", prefix, segment)
            };
            match node {
                Node::Procedure(procedure) => out.push((path, procedure)),
                Node::Router(nested) => nested.collect(&path, out),
            }
        }
    }

    /// List all procedure paths
    pub fn paths(&self) -> Vec<String> {
        self.procedures().into_iter().map(|(path, _)| path).collect()
    }

    /// Number of procedures in the whole tree.
    pub fn procedure_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, node)| match node {
                Node::Procedure(_) => 1,
                Node::Router(nested) => nested.procedure_count(),
            })
            .sum()
    }

    /// Export the shape of this tree.
    pub fn contract(&self) -> RouterContract {
        RouterContract::from_procedures(self.procedures())
    }
}
