//! Constraint set: deduplicated "from before to" edges

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::errors::{FlowError, Result};
use crate::flow::registry::{ActionRef, ActionRegistry};

/// How binding an edge is when one of its endpoints never gets registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Declared through a reference; dropped if an endpoint is absent
    Weak,
    /// Both endpoints must be registered by compile time
    Strong,
}

/// Directed ordering constraints between slots of one registry
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    edges: BTreeMap<(ActionRef, ActionRef), EdgeKind>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `from -> to`. Returns `true` when the edge is new.
    ///
    /// Self edges are rejected here, at declaration, rather than at sort
    /// time. Re-adding an edge keeps the stronger of the two kinds.
    pub fn add_edge<A>(
        &mut self,
        registry: &ActionRegistry<A>,
        from: ActionRef,
        to: ActionRef,
        kind: EdgeKind,
    ) -> Result<bool> {
        if from == to {
            return Err(FlowError::self_dependency(
                registry.flow(),
                registry.name(from),
            ));
        }

        match self.edges.get_mut(&(from, to)) {
            Some(existing) => {
                *existing = (*existing).max(kind);
                Ok(false)
            }
            None => {
                debug!(
                    "Added edge {} -> {} in flow {}",
                    registry.name(from),
                    registry.name(to),
                    registry.flow()
                );
                self.edges.insert((from, to), kind);
                Ok(true)
            }
        }
    }

    pub fn contains(&self, from: ActionRef, to: ActionRef) -> bool {
        self.edges.contains_key(&(from, to))
    }

    pub fn kind(&self, from: ActionRef, to: ActionRef) -> Option<EdgeKind> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionRef, ActionRef, EdgeKind)> + '_ {
        self.edges.iter().map(|(&(from, to), &kind)| (from, to, kind))
    }
}
