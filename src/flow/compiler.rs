//! Topological compiler
//!
//! Kahn's algorithm over the registered actions of a [`Graph`], always
//! taking the ready action with the smallest identity. The tie-break is
//! intrinsic to the actions, so the output depends only on membership and
//! never on the order contributions were added.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::core::config::FlowSettings;
use crate::core::errors::{FlowError, Result};
use crate::flow::constraints::EdgeKind;
use crate::flow::graph::Graph;
use crate::flow::registry::ActionRef;
use crate::flow::sequence::{CompiledSequence, Step};

/// Compile `graph` into an immutable sequence, or fail without producing one
pub fn compile<A>(graph: &Graph<A>, settings: &FlowSettings) -> Result<CompiledSequence<A>> {
    let registry = graph.registry();
    let flow = graph.name();

    if let Some(limit) = settings.max_actions {
        if registry.len() > limit {
            return Err(FlowError::capacity_exceeded(flow, registry.len(), limit));
        }
    }

    let dag = resolve(graph)?;
    let order = kahn(&dag, |node| registry.name(dag[node]));

    if order.len() < dag.node_count() {
        return Err(cycle_error(graph, &dag, &order));
    }

    let steps: Vec<Step<A>> = order
        .iter()
        .filter_map(|&node| registry.action(dag[node]))
        .map(Step::from_action)
        .collect();

    info!(
        "Compiled flow {} ({} actions, {} edges)",
        flow,
        steps.len(),
        dag.edge_count()
    );

    Ok(CompiledSequence::new(flow, steps, settings.trace_steps))
}

/// Build the dependency graph of registered actions, checking edge endpoints
fn resolve<A>(graph: &Graph<A>) -> Result<DiGraph<ActionRef, ()>> {
    let registry = graph.registry();
    let mut dag = DiGraph::with_capacity(registry.len(), graph.constraints().len());
    let mut nodes: HashMap<ActionRef, NodeIndex> = HashMap::with_capacity(registry.len());

    for (action_ref, _) in registry.iter() {
        nodes.insert(action_ref, dag.add_node(action_ref));
    }

    // Sorted by identity so the reported endpoint is reproducible.
    let mut edges: Vec<_> = graph.constraints().iter().collect();
    edges.sort_by(|&(f1, t1, _), &(f2, t2, _)| {
        (registry.name(f1), registry.name(t1)).cmp(&(registry.name(f2), registry.name(t2)))
    });

    for (from, to, kind) in edges {
        match (nodes.get(&from), nodes.get(&to)) {
            (Some(&f), Some(&t)) => {
                dag.add_edge(f, t, ());
            }
            _ if kind == EdgeKind::Weak => {
                debug!(
                    "Dropping edge {} -> {} in flow {}: endpoint not included",
                    registry.name(from),
                    registry.name(to),
                    graph.name()
                );
            }
            (None, _) => {
                return Err(FlowError::unknown_action(
                    graph.name(),
                    registry.name(from),
                    registry.name(to),
                ));
            }
            (_, None) => {
                return Err(FlowError::unknown_action(
                    graph.name(),
                    registry.name(to),
                    registry.name(from),
                ));
            }
        }
    }

    Ok(dag)
}

/// Kahn's algorithm with a ready set ordered by `key`
fn kahn<'k, N, F>(dag: &DiGraph<N, ()>, key: F) -> Vec<NodeIndex>
where
    F: Fn(NodeIndex) -> &'k str,
{
    let mut in_degree: Vec<usize> = dag
        .node_indices()
        .map(|node| dag.neighbors_directed(node, Direction::Incoming).count())
        .collect();

    let mut ready: BTreeMap<&str, NodeIndex> = dag
        .node_indices()
        .filter(|node| in_degree[node.index()] == 0)
        .map(|node| (key(node), node))
        .collect();

    let mut order = Vec::with_capacity(dag.node_count());
    while let Some((_, node)) = ready.pop_first() {
        order.push(node);
        for next in dag.neighbors_directed(node, Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.insert(key(next), next);
            }
        }
    }

    order
}

/// Describe the actions that never became ready
fn cycle_error<A>(
    graph: &Graph<A>,
    dag: &DiGraph<ActionRef, ()>,
    order: &[NodeIndex],
) -> FlowError {
    let registry = graph.registry();
    let mut emitted = vec![false; dag.node_count()];
    for node in order {
        emitted[node.index()] = true;
    }

    let residual = dag.filter_map(
        |node, &action_ref| (!emitted[node.index()]).then_some(action_ref),
        |_, _| Some(()),
    );

    let unresolved: Vec<String> = residual
        .node_indices()
        .map(|node| registry.name(residual[node]).to_string())
        .collect();

    let cycles: Vec<Vec<String>> = tarjan_scc(&residual)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            component
                .into_iter()
                .map(|node| registry.name(residual[node]).to_string())
                .collect()
        })
        .collect();

    FlowError::cycle(graph.name(), unresolved, cycles)
}
