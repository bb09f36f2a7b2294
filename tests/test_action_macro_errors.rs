//! Broken link-time declarations surface when their flow is compiled

use flowseq::{FlowConfig, FlowError, FlowSet};
use pretty_assertions::assert_eq;

#[flowseq::action(flow = "broken", after = "missing")]
fn orphan() {}

#[flowseq::action(flow = "loop", before = "pong")]
fn ping() {}

#[flowseq::action(flow = "loop", before = "ping")]
fn pong() {}

#[flowseq::action(flow = "fine")]
fn fine() {}

#[test]
fn test_unknown_predecessor() {
    let flows = FlowSet::collect(FlowConfig::default()).unwrap();
    match flows.compile("broken").unwrap_err() {
        FlowError::UnknownAction {
            flow,
            action,
            referenced_by,
        } => {
            assert_eq!(flow, "broken");
            assert_eq!(action, "missing");
            assert_eq!(referenced_by, "orphan");
        }
        other => panic!("Expected unknown action, got {other:?}"),
    }
}

#[test]
fn test_cycle_across_declarations() {
    let flows = FlowSet::collect(FlowConfig::default()).unwrap();
    let err = flows.compile("loop").unwrap_err();
    assert!(matches!(err, FlowError::Cycle { .. }));
    assert_eq!(err.implicated(), vec!["ping", "pong"]);
}

#[test]
fn test_failures_stay_in_their_flow() {
    let flows = FlowSet::collect(FlowConfig::default()).unwrap();
    assert_eq!(flows.compile("fine").unwrap().len(), 1);

    // Flows compile in identity order, so "broken" is reported first.
    let err = flows.compile_all().unwrap_err();
    assert_eq!(err.flow(), Some("broken"));
}
