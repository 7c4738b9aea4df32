use std::sync::Arc;

use hostcall::Bridge;
use hostcall::config::BridgeConfig;
use hostcall::kernel::DispatchError;
use hostcall::primitives::{RouteResult, RouteStatus, ToolRequest};
use hostcall::tools::ToolRegistry;
use hostcall::tool;
use serde_json::json;

/// Multiplies two integers.
#[tool(tags("math"))]
pub fn multiply(a: i64, b: i64) -> i64 {
    a * b
}

#[tool]
pub fn reject() -> Result<(), String> {
    Err("nope".into())
}

fn bridge(config: &str) -> Bridge {
    let config = BridgeConfig::from_toml_str(config).expect("config");
    Bridge::start(&config, Arc::new(ToolRegistry::discover())).expect("bridge")
}

#[test]
fn bridge_serves_calls_and_counts_them() {
    let bridge = bridge("[host]\ntick_interval_ms = 2\nthread_name = \"bridge-host\"");

    let product = bridge.call(&ToolRequest::new("multiply").with_param("a", 6).with_param("b", 7));
    assert_eq!(product, RouteResult::ok(json!(42)));
    assert!(bridge.call(&ToolRequest::new("reject")).is_delayed());
    assert_eq!(bridge.call(&ToolRequest::new("absent")).status, RouteStatus::NotFound);

    let stats = bridge.stats();
    assert_eq!(stats.queued, 2);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.not_found, 1);

    bridge.shutdown().expect("clean shutdown");
}

#[test]
fn catalog_uses_configured_routes() {
    let bridge = bridge("[catalog]\nroute_prefix = \"/scene/\"\ndefault_method = \"put\"");

    let catalog = bridge.catalog();
    let entry = &catalog.tools["multiply"];
    assert_eq!(entry.call.path, "/scene/multiply");
    assert_eq!(entry.call.method, "PUT");
    assert_eq!(entry.description, "Multiplies two integers.");
    assert_eq!(entry.tags, ["math"]);

    bridge.shutdown().expect("clean shutdown");
}

#[tokio::test]
async fn async_calls_resolve_through_the_bridge() {
    let bridge = bridge("");
    let result = bridge
        .call_async(&ToolRequest::new("multiply").with_param("a", 3).with_param("b", 3))
        .await;
    assert_eq!(result, RouteResult::ok(json!(9)));
}

#[test]
fn invalid_configs_fail_to_start() {
    let registry = Arc::new(ToolRegistry::discover());

    let mut config = BridgeConfig::default();
    config.host.tick_interval_ms = 0;
    let err = Bridge::start(&config, registry.clone()).expect_err("zero tick interval");
    assert!(
        matches!(err, DispatchError::HostStart { ref reason } if reason.contains("tick_interval_ms")),
        "unexpected error: {err}"
    );

    let mut config = BridgeConfig::default();
    config.catalog.route_prefix = "scene".into();
    let err = Bridge::start(&config, registry).expect_err("relative route prefix");
    assert!(matches!(err, DispatchError::HostStart { .. }));
}
