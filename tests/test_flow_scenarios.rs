//! End-to-end scenarios for declaring, compiling and running flows

use anyhow::Result;
use flowseq::{Action, CompiledSequence, DuplicatePolicy, FlowConfig, FlowError, FlowSet, Graph};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn noop(name: &str) -> Action {
    Action::new(name.to_string(), || {})
}

fn order(seq: &CompiledSequence) -> Vec<String> {
    seq.names().map(str::to_string).collect()
}

/// Every declared constraint holds in the compiled order
fn assert_respects_edges(graph: &Graph, seq: &CompiledSequence) {
    for (from, to) in graph.edges() {
        let (f, t) = (seq.position(from), seq.position(to));
        assert!(f < t, "{from} must run before {to}, got {:?}", order(seq));
    }
}

#[test]
fn test_single_edge_scenario() -> Result<()> {
    init_tracing();
    let (a, b) = (noop("a"), noop("b"));
    let mut graph = Graph::new("isr");
    graph.add(&a >> &b)?;

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(order(&graph.compile()?), vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_overlapping_contributions_scenario() -> Result<()> {
    init_tracing();
    let (a, b, c) = (noop("a"), noop("b"), noop("c"));
    let mut graph = Graph::new("isr");
    graph.add(&a >> &b)?;
    graph.add(&b >> &c)?;

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(order(&graph.compile()?), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_repeated_edge_scenario() -> Result<()> {
    let (a, b) = (noop("a"), noop("b"));
    let mut graph = Graph::new("isr");
    graph.add(&a >> &b)?;
    graph.add(&a >> &b)?;

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    Ok(())
}

#[test]
fn test_unconstrained_actions_are_deterministic() -> Result<()> {
    let (a, b, c) = (noop("a"), noop("b"), noop("c"));
    let mut graph = Graph::new("isr");
    graph.add(&c & &b & &a)?;

    assert_eq!(graph.edge_count(), 0);
    let first = order(&graph.compile()?);
    for _ in 0..10 {
        assert_eq!(order(&graph.compile()?), first);
    }
    Ok(())
}

#[test]
fn test_diamond_scenario() -> Result<()> {
    let (a, b, c, d) = (noop("a"), noop("b"), noop("c"), noop("d"));
    let mut graph = Graph::new("isr");
    graph.add(&a >> (&b & &c) >> &d)?;

    let seq = graph.compile()?;
    assert_eq!(seq.position("a"), Some(0));
    assert_eq!(seq.position("d"), Some(3));
    assert_respects_edges(&graph, &seq);
    Ok(())
}

#[test]
fn test_self_edge_fails_immediately() {
    let a = noop("a");
    let mut graph = Graph::new("isr");
    let err = graph.add(&a >> &a).err().unwrap();
    assert!(matches!(err, FlowError::SelfDependency { ref action, .. } if action == "a"));
    assert_eq!(err.category(), "self_dependency");
}

#[test]
fn test_cycle_fails_with_participants() {
    init_tracing();
    let (a, b, c) = (noop("a"), noop("b"), noop("c"));
    let mut graph = Graph::new("isr");
    graph.add(&a >> &b >> &c).unwrap();
    graph.add(&c >> &a).unwrap();

    let err = graph.compile().unwrap_err();
    let implicated = err.implicated();
    for name in ["a", "b", "c"] {
        assert!(implicated.contains(&name), "{name} missing from {implicated:?}");
    }
    assert!(err.to_string().contains("isr"));
}

#[test]
fn test_membership_order_does_not_matter() -> Result<()> {
    let (a, b, c, d, e) = (noop("a"), noop("b"), noop("c"), noop("d"), noop("e"));
    let contributions = || {
        vec![
            &e >> &b,
            &a >> &c,
            (&d & &b) >> &c,
            &a >> &d,
        ]
    };

    let mut forward = Graph::new("isr");
    for fragment in contributions() {
        forward.add(fragment)?;
    }
    let mut backward = Graph::new("isr");
    for fragment in contributions().into_iter().rev() {
        backward.add(fragment)?;
    }

    let seq = forward.compile()?;
    assert_eq!(order(&seq), order(&backward.compile()?));
    assert_eq!(order(&seq), vec!["a", "d", "e", "b", "c"]);
    assert_respects_edges(&forward, &seq);
    Ok(())
}

#[test]
fn test_every_step_runs_once_per_call() -> Result<()> {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = |name: &str| {
        let hits = hits.clone();
        Action::new(name.to_string(), move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    };

    let mut graph = Graph::new("timer_isr");
    graph.add(counter("read") >> counter("filter") >> counter("publish"))?;
    graph.register(Action::milestone("done"))?;
    graph.add_edge("publish", "done")?;

    let seq = graph.compile()?;
    assert_eq!(order(&seq), vec!["read", "filter", "publish", "done"]);
    for _ in 0..5 {
        seq.call();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 15);
    Ok(())
}

#[test]
fn test_sequence_outlives_graph_and_crosses_threads() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let seq = {
        let mut graph = Graph::new("isr");
        for name in ["b", "a"] {
            let log = log.clone();
            graph.register(Action::new(name, move || log.lock().unwrap().push(name)))?;
        }
        graph.compile()?
    };

    let run = seq.into_fn();
    std::thread::spawn(move || run(&())).join().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_arguments_threaded_to_every_action() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut graph: Graph<u8> = Graph::new("irq");
    for name in ["ack", "dispatch"] {
        let seen = seen.clone();
        graph.register(Action::with_args(name, move |line: &u8| {
            seen.lock().unwrap().push((name, *line))
        }))?;
    }
    graph.add_edge("ack", "dispatch")?;

    let seq = graph.compile()?;
    seq.run(&7);
    assert_eq!(*seen.lock().unwrap(), vec![("ack", 7), ("dispatch", 7)]);
    Ok(())
}

#[test]
fn test_flow_set_with_yaml_config() -> Result<()> {
    init_tracing();
    let config = FlowConfig::from_yaml_str(
        r#"
duplicate_policy: first_wins
trace_steps: true
flows:
  init:
    max_actions: 8
"#,
    )?;
    assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);

    let (power, clocks) = (noop("power"), noop("clocks"));
    let mut flows = FlowSet::new(config)?;
    flows.contribute("init", &power >> &clocks)?;
    // A second, different body for "clocks": first wins, no error.
    flows.contribute("init", Action::new("clocks", || {}))?;
    flows.contribute("idle", noop("wfi"))?;

    let compiled = flows.compile_all()?;
    assert_eq!(compiled.keys().map(String::as_str).collect::<Vec<_>>(), vec!["idle", "init"]);
    assert_eq!(order(&compiled["init"]), vec!["power", "clocks"]);
    compiled["init"].call();
    Ok(())
}

fn uart_init() {}

#[test]
fn test_same_fn_declared_at_two_sites() -> Result<()> {
    let tx = noop("tx");
    let mut flows: FlowSet = FlowSet::new(FlowConfig::default())?;
    flows.contribute("init", Action::new("uart", uart_init) >> &tx)?;
    flows.contribute("init", Action::new("uart", uart_init))?;

    assert_eq!(order(&flows.compile("init")?), vec!["uart", "tx"]);
    Ok(())
}

#[test]
fn test_rejected_contribution_keeps_flow_intact() -> Result<()> {
    let (dma, uart) = (noop("dma"), Action::new("uart", uart_init));
    let mut flows: FlowSet = FlowSet::new(FlowConfig::default())?;
    flows.contribute("init", &uart)?;

    let err = flows
        .contribute("init", &dma >> Action::new("uart", || {}))
        .unwrap_err();
    assert_eq!(err.category(), "duplicate_definition");
    assert_eq!(order(&flows.compile("init")?), vec!["uart"]);
    Ok(())
}

#[test]
fn test_unknown_action_is_reported() {
    let mut graph: Graph = Graph::new("init");
    graph.register(noop("uart")).unwrap();
    graph.add_edge("clocks", "uart").unwrap();

    let err = graph.compile().unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnknownAction { ref action, ref referenced_by, .. }
            if action == "clocks" && referenced_by == "uart"
    ));
}
