//! Graph accumulator for one flow identity

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::config::{DuplicatePolicy, FlowSettings};
use crate::core::errors::{FlowError, Result};
use crate::flow::action::Action;
use crate::flow::compiler;
use crate::flow::constraints::{ConstraintSet, EdgeKind};
use crate::flow::dsl::{Fragment, Mode};
use crate::flow::registry::{ActionRef, ActionRegistry};
use crate::flow::sequence::CompiledSequence;

/// Accumulated actions and ordering constraints of one named flow.
///
/// Contributions are unioned by identity, so membership never depends on
/// the order in which they arrive.
pub struct Graph<A = ()> {
    registry: ActionRegistry<A>,
    constraints: ConstraintSet,
}

impl<A> Graph<A> {
    /// Create an empty graph that rejects conflicting duplicate definitions
    pub fn new<F: Into<Arc<str>>>(flow: F) -> Self {
        Self::with_policy(flow, DuplicatePolicy::default())
    }

    pub fn with_policy<F: Into<Arc<str>>>(flow: F, policy: DuplicatePolicy) -> Self {
        Self {
            registry: ActionRegistry::new(flow, policy),
            constraints: ConstraintSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.registry.flow()
    }

    pub fn registry(&self) -> &ActionRegistry<A> {
        &self.registry
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Register a single action with no constraints
    pub fn register(&mut self, action: Action<A>) -> Result<ActionRef> {
        self.registry.register(action)
    }

    /// Strong `from -> to` edge by identity.
    ///
    /// Endpoints need not be registered yet; a missing one is reported when
    /// the graph is compiled.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<&mut Self> {
        if from == to {
            return Err(FlowError::self_dependency(self.name(), from));
        }
        let from = self.registry.intern(from);
        let to = self.registry.intern(to);
        self.constraints
            .add_edge(&self.registry, from, to, EdgeKind::Strong)?;
        Ok(self)
    }

    /// Union a declarative contribution into this graph.
    ///
    /// All or nothing: if any member or edge is rejected the graph is left
    /// exactly as it was.
    pub fn add<F: Into<Fragment<A>>>(&mut self, fragment: F) -> Result<&mut Self> {
        let (members, edges) = fragment.into().into_parts();
        self.check_fragment(&members, &edges)?;

        let mut slots = Vec::with_capacity(members.len());
        let mut modes = Vec::with_capacity(members.len());
        for (action, mode) in members {
            let slot = match mode {
                Mode::Include => self.registry.register(action)?,
                Mode::Reference => self.registry.intern(action.name()),
            };
            slots.push(slot);
            modes.push(mode);
        }

        for (from, to) in edges {
            let kind = if modes[from] == Mode::Reference || modes[to] == Mode::Reference {
                EdgeKind::Weak
            } else {
                EdgeKind::Strong
            };
            self.constraints
                .add_edge(&self.registry, slots[from], slots[to], kind)?;
        }

        Ok(self)
    }

    fn check_fragment(&self, members: &[(Action<A>, Mode)], edges: &[(usize, usize)]) -> Result<()> {
        for &(from, to) in edges {
            let name = members[from].0.name();
            if name == members[to].0.name() {
                return Err(FlowError::self_dependency(self.name(), name));
            }
        }

        let mut pending: HashMap<&str, &Action<A>> = HashMap::new();
        for (action, mode) in members {
            if *mode == Mode::Reference {
                continue;
            }
            self.registry.check(action)?;
            match pending.entry(action.name()) {
                Entry::Occupied(first) => {
                    if self.registry.policy() == DuplicatePolicy::Reject
                        && !first.get().same_definition(action)
                    {
                        return Err(FlowError::duplicate(self.name(), action.name()));
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(action);
                }
            }
        }
        Ok(())
    }

    /// Union another graph's membership into this one, all or nothing
    pub fn merge(&mut self, other: &Graph<A>) -> Result<&mut Self> {
        for (_, action) in other.registry.iter() {
            self.registry.check(action)?;
        }

        let mut remap: HashMap<ActionRef, ActionRef> = HashMap::new();

        for (theirs, action) in other.registry.iter() {
            let ours = self.registry.register(action.clone())?;
            remap.insert(theirs, ours);
        }
        for name in other.registry.unregistered() {
            if let Some(theirs) = other.registry.get(name) {
                remap.insert(theirs, self.registry.intern(name));
            }
        }

        for (from, to, kind) in other.constraints.iter() {
            self.constraints
                .add_edge(&self.registry, remap[&from], remap[&to], kind)?;
        }

        Ok(self)
    }

    /// Number of distinct registered actions
    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of distinct declared constraints
    pub fn edge_count(&self) -> usize {
        self.constraints.len()
    }

    /// Registered identities, sorted
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self.registry.iter().map(|(_, a)| a.name()).collect();
        nodes.sort_unstable();
        nodes
    }

    /// Declared constraints by identity, sorted
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .constraints
            .iter()
            .map(|(from, to, _)| (self.registry.name(from), self.registry.name(to)))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Order-independent description of the current membership
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut milestones: Vec<String> = self
            .registry
            .iter()
            .filter(|(_, action)| action.is_milestone())
            .map(|(_, action)| action.name().to_string())
            .collect();
        milestones.sort();

        let mut unregistered: Vec<String> =
            self.registry.unregistered().map(str::to_string).collect();
        unregistered.sort();

        let mut edges: Vec<EdgeSnapshot> = self
            .constraints
            .iter()
            .map(|(from, to, kind)| EdgeSnapshot {
                from: self.registry.name(from).to_string(),
                to: self.registry.name(to).to_string(),
                weak: kind == EdgeKind::Weak,
            })
            .collect();
        edges.sort();

        GraphSnapshot {
            flow: self.name().to_string(),
            actions: self.nodes().into_iter().map(str::to_string).collect(),
            milestones,
            unregistered,
            edges,
        }
    }

    /// Graphviz rendering of registered actions and the edges between them
    pub fn to_dot(&self) -> String {
        let mut dot: DiGraph<&str, &str> = DiGraph::new();
        let mut index = HashMap::new();
        for name in self.nodes() {
            index.insert(name, dot.add_node(name));
        }
        for (from, to) in self.edges() {
            if let (Some(&f), Some(&t)) = (index.get(from), index.get(to)) {
                dot.add_edge(f, t, "");
            }
        }
        format!("{}", Dot::with_config(&dot, &[Config::EdgeNoLabel]))
    }

    /// Compile with default settings
    pub fn compile(&self) -> Result<CompiledSequence<A>> {
        compiler::compile(self, &FlowSettings::default())
    }

    pub fn compile_with(&self, settings: &FlowSettings) -> Result<CompiledSequence<A>> {
        compiler::compile(self, settings)
    }
}

impl<A> fmt::Debug for Graph<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("flow", &self.name())
            .field("nodes", &self.nodes())
            .field("edges", &self.edges())
            .finish()
    }
}

/// Serializable, sorted view of a graph's membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub flow: String,
    pub actions: Vec<String>,
    pub milestones: Vec<String>,
    /// Identities mentioned by edges or references but never registered
    pub unregistered: Vec<String>,
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub from: String,
    pub to: String,
    pub weak: bool,
}
