//! Scene host demo: caller threads edit a scene graph owned by a host thread.

mod scene;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use clap::Parser;
use hostcall::Bridge;
use hostcall::config::BridgeConfig;
use hostcall::kernel::Dispatcher;
use hostcall::primitives::{RouteResult, ToolRequest};
use hostcall::telemetry::init_tracing;
use hostcall::tools::{CatalogOptions, ToolRegistry};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "scene-host", about = "Drive a host-owned scene graph from caller threads")]
struct Args {
    /// Bridge configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the tool catalog as JSON and exit.
    #[arg(long)]
    catalog: bool,

    /// Number of concurrent caller threads.
    #[arg(long, default_value_t = 4)]
    callers: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    if args.catalog {
        let registry = ToolRegistry::discover();
        let options = CatalogOptions::new(
            config.catalog.route_prefix.clone(),
            config.catalog.default_method.clone(),
        );
        println!("{}", registry.catalog(&options).to_json_pretty()?);
        return Ok(());
    }

    init_tracing(&config.telemetry.filter)?;

    let registry = Arc::new(ToolRegistry::new());
    let report = registry.rediscover();
    for rejection in &report.rejected {
        warn!(tool = %rejection.name, reason = %rejection.reason, "tool skipped");
    }
    info!(tools = report.registered.len(), "registry ready");

    let bridge = Bridge::start(&config, registry)?;
    thread::scope(|scope| {
        for caller in 0..args.callers {
            let dispatcher = bridge.dispatcher();
            scope.spawn(move || populate(dispatcher, caller));
        }
    });

    let settled = bridge.call(&ToolRequest::new("settle").with_param("frames", 3));
    info!(result = %render(&settled), "scene settled");

    // The failure is reported to the next result-bearing call.
    let ack = bridge.call(&ToolRequest::new("delete_node").with_param("id", 9999));
    info!(delayed = ack.is_delayed(), "delete of missing node queued");
    let poisoned = bridge.call(&ToolRequest::new("list_nodes"));
    info!(result = %render(&poisoned), "call after failed delete");

    let listing = bridge.call(&ToolRequest::new("list_nodes").with_param("kind", "light"));
    info!(result = %render(&listing), "lights");

    let stats = bridge.stats();
    info!(
        queued = stats.queued,
        succeeded = stats.succeeded,
        failed = stats.failed,
        background_failures = stats.background_failures,
        "dispatch totals"
    );
    bridge.shutdown()?;
    Ok(())
}

fn populate(dispatcher: &Dispatcher, caller: usize) {
    let kind = if caller % 2 == 0 { "mesh" } else { "light" };
    let spawned = dispatcher.dispatch_blocking(
        &ToolRequest::new("spawn_node")
            .with_param("name", format!("node-{caller}"))
            .with_param("kind", kind)
            .with_param("position", json!({ "x": caller, "y": 0.0, "z": 0.0 })),
    );
    let Some(id) = spawned
        .payload
        .as_ref()
        .and_then(|node| node.get("id"))
        .and_then(serde_json::Value::as_u64)
    else {
        warn!(caller, result = %render(&spawned), "spawn failed");
        return;
    };

    let ack = dispatcher.dispatch_blocking(
        &ToolRequest::new("move_node")
            .with_param("id", id)
            .with_param("x", 1.5)
            .with_param("y", 2.5)
            .with_param("z", -1.0),
    );
    let renamed =
        dispatcher.dispatch_blocking(&ToolRequest::new("rename_node").with_param("id", id));
    info!(
        caller,
        delayed = ack.is_delayed(),
        renamed = %render(&renamed),
        "caller finished"
    );
}

fn render(result: &RouteResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|err| err.to_string())
}
