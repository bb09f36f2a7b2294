//! Accumulation across flow identities
//!
//! Declaration sites anywhere in the final binary add a [`Contribution`] to
//! the [`CONTRIBUTIONS`] slice (usually through `#[flowseq::action]`).
//! [`FlowSet::collect`] unions them per flow and compiles each flow once.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::core::config::FlowConfig;
use crate::core::errors::{FlowError, Result};
use crate::flow::dsl::Fragment;
use crate::flow::graph::Graph;
use crate::flow::sequence::CompiledSequence;

/// A link-time registered partial graph for one flow identity
pub struct Contribution {
    pub flow: &'static str,
    /// `file:line` of the declaration, used to order and report contributions
    pub location: &'static str,
    pub contribute: fn(&mut Graph) -> Result<()>,
}

// Global flow contributions using linkme
#[linkme::distributed_slice]
pub static CONTRIBUTIONS: [Contribution] = [..];

/// Graphs keyed by flow identity, plus the config used to compile them
pub struct FlowSet<A = ()> {
    config: FlowConfig,
    graphs: BTreeMap<String, Graph<A>>,
}

impl FlowSet<()> {
    /// Gather every contribution linked into the binary
    pub fn collect(config: FlowConfig) -> Result<Self> {
        Self::from_contributions(config, &CONTRIBUTIONS)
    }

    /// Apply contributions in `(flow, location)` order.
    ///
    /// Membership is the same for any order; sorting only makes the first
    /// reported error reproducible across links.
    pub fn from_contributions(config: FlowConfig, contributions: &[Contribution]) -> Result<Self> {
        let mut sorted: Vec<&Contribution> = contributions.iter().collect();
        sorted.sort_by_key(|c| (c.flow, c.location));

        let mut set = Self::new(config)?;
        for contribution in sorted {
            debug!(
                "Applying contribution to flow {} from {}",
                contribution.flow, contribution.location
            );
            (contribution.contribute)(set.graph_mut(contribution.flow))?;
        }

        info!(
            "Collected {} contributions into {} flows",
            contributions.len(),
            set.graphs.len()
        );
        Ok(set)
    }
}

impl<A> FlowSet<A> {
    pub fn new(config: FlowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            graphs: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Graph for `flow`, created empty on first use
    pub fn graph_mut(&mut self, flow: &str) -> &mut Graph<A> {
        let policy = self.config.duplicate_policy;
        self.graphs
            .entry(flow.to_string())
            .or_insert_with(|| Graph::with_policy(flow, policy))
    }

    pub fn graph(&self, flow: &str) -> Option<&Graph<A>> {
        self.graphs.get(flow)
    }

    /// Union a declarative contribution into `flow`.
    ///
    /// A rejected contribution leaves the set unchanged, including not
    /// creating `flow` if it was new.
    pub fn contribute<F: Into<Fragment<A>>>(&mut self, flow: &str, fragment: F) -> Result<()> {
        self.apply(flow, |graph| graph.add(fragment).map(|_| ()))
    }

    /// Union a whole graph into the flow of the same name
    pub fn merge(&mut self, graph: &Graph<A>) -> Result<()> {
        self.apply(graph.name(), |ours| ours.merge(graph).map(|_| ()))
    }

    fn apply<F>(&mut self, flow: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Graph<A>) -> Result<()>,
    {
        if let Some(graph) = self.graphs.get_mut(flow) {
            return change(graph);
        }
        let mut graph = Graph::with_policy(flow, self.config.duplicate_policy);
        change(&mut graph)?;
        self.graphs.insert(flow.to_string(), graph);
        Ok(())
    }

    /// Known flow identities, sorted
    pub fn flows(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn compile(&self, flow: &str) -> Result<CompiledSequence<A>> {
        let graph = self
            .graphs
            .get(flow)
            .ok_or_else(|| FlowError::unknown_flow(flow))?;
        graph.compile_with(&self.config.for_flow(flow))
    }

    /// Compile every flow; the first failure aborts the whole set
    pub fn compile_all(&self) -> Result<BTreeMap<String, CompiledSequence<A>>> {
        let mut compiled = BTreeMap::new();
        for flow in self.graphs.keys() {
            compiled.insert(flow.clone(), self.compile(flow)?);
        }
        Ok(compiled)
    }
}
