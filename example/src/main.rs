use anyhow::{Context, Result};
use flowseq::{Action, FlowConfig, FlowSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

static TICKS: AtomicU32 = AtomicU32::new(0);

// Boot sequence, declared across what would normally be separate drivers

#[flowseq::action(flow = "init", before = "clocks")]
fn power() {
    info!("power rails up");
}

#[flowseq::action(flow = "init")]
fn clocks() {
    info!("peripheral clocks enabled");
}

#[flowseq::action(flow = "init", name = "uart", after = "clocks")]
fn init_uart() {
    info!("uart configured");
}

#[flowseq::action(flow = "init", name = "spi", after = "clocks")]
fn init_spi() {
    info!("spi configured");
}

// Timer interrupt: read, filter, then publish

#[flowseq::action(flow = "timer_isr", before = "filter")]
fn sample() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

#[flowseq::action(flow = "timer_isr", before = "publish")]
fn filter() {}

#[flowseq::action(flow = "timer_isr")]
fn publish() {}

fn main() -> Result<()> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => FlowConfig::load_yaml_file(&path)
            .with_context(|| format!("Failed to load flow config from {path}"))?,
        None => FlowConfig::default(),
    };

    let mut flows = FlowSet::collect(config)?;

    // Code-built contributions union with the attribute-declared ones
    let stable: Action = Action::milestone("clocks_stable");
    let console: Action = Action::milestone("console_ready");
    flows.contribute("init", stable.reference() >> &console)?;
    flows.contribute("init", &stable)?;
    flows
        .graph_mut("init")
        .add_edge("clocks", "clocks_stable")?
        .add_edge("uart", "console_ready")?;

    for flow in flows.flows() {
        if let Some(graph) = flows.graph(flow) {
            println!("{}", graph.to_dot());
        }
    }

    let compiled = flows.compile_all()?;
    for (flow, sequence) in &compiled {
        info!("{flow}: {}", sequence.names().collect::<Vec<_>>().join(" -> "));
    }

    compiled["init"].call();

    let timer_isr = compiled["timer_isr"].clone().into_fn();
    for _ in 0..3 {
        timer_isr(&());
    }
    info!("timer fired {} times", TICKS.load(Ordering::Relaxed));

    Ok(())
}
