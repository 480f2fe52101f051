//! Behavior tree demo driver.
//!
//! Assembles a small patrol-style tree from the stock behaviors and ticks it
//! at a fixed rate, logging the tip after every tick.
//!
//! ```bash
//! RUST_LOG=bt_core=debug BT_DEMO_TICKS=20 cargo run -p bt-demo
//! ```
mod config;

use anyhow::{Context, Result};
use bt_core::behaviours::{Count, Periodic, Running, SuccessEveryN};
use bt_core::builder::{failure_is_running, leaf, one_shot, selector, sequence, timeout};
use bt_core::{BehaviorTree, DebugVisitor, Node};

use crate::config::DemoConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DemoConfig::from_env();
    tracing::info!("Starting behavior tree demo");
    tracing::info!("Tick period: {:?}", config.period);
    tracing::info!("Ticks: {:?}", config.ticks);

    let mut tree = BehaviorTree::new(build_tree());
    tree.add_visitor(DebugVisitor);
    tree.setup(config.setup_timeout)
        .context("failed to set up the demo tree")?;

    let mut report = |tree: &BehaviorTree| {
        let tip = tree
            .tip()
            .and_then(|id| tree.node(id))
            .map(Node::name)
            .unwrap_or("-");
        tracing::info!(
            "Tick {} [{}] tip: {}",
            tree.count(),
            tree.root().status(),
            tip
        );
    };
    let ticks = tree.tick_tock(config.period, config.ticks, None, Some(&mut report));

    tree.shutdown();
    tracing::info!("Finished after {} ticks", ticks);
    Ok(())
}

/// ```text
/// Selector
///   OneShot [Calibrate]
///   Sequence "Patrol"
///     Timeout [Waypoints]
///     FailureIsRunning [Scan]
///   Idle
/// ```
fn build_tree() -> Node {
    selector(vec![
        one_shot(leaf(Count::new(0, 2, 3)).named("Calibrate")),
        sequence(vec![
            timeout(
                std::time::Duration::from_secs(30),
                leaf(Periodic::new(3)).named("Waypoints"),
            ),
            failure_is_running(leaf(SuccessEveryN::new(4)).named("Scan")),
        ])
        .named("Patrol"),
        leaf(Running).named("Idle"),
    ])
    .named("Demo")
}
