//! Liveness, configuration and process-metrics endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::ServerState;

/// `GET /api/v1/ping`
pub async fn ping_handler() -> Json<Value> {
    Json(json!({ "value": "pong" }))
}

/// `GET /api/v1/config`: the effective configuration.
pub async fn config_handler(State(state): State<ServerState>) -> Json<Value> {
    Json(serde_json::to_value(state.svc.config()).unwrap_or_else(|_| json!({})))
}

/// `GET /api/v1/metrics`: CPU seconds and memory usage of this process.
pub async fn metrics_handler() -> Json<Value> {
    let (cpu, alloc, heap) = process_stats();
    Json(json!({ "CPU": cpu, "Alloc": alloc, "Heap": heap }))
}

/// Read CPU time and memory from procfs; zeros where unavailable.
fn process_stats() -> (f64, u64, u64) {
    let cpu = std::fs::read_to_string("/proc/self/stat")
        .ok()
        .and_then(|stat| {
            // utime and stime are fields 14 and 15, after the parenthesized
            // command name which may itself contain spaces.
            let rest = stat.rsplit(')').next()?;
            let fields: Vec<&str> = rest.split_whitespace().collect();
            let utime: f64 = fields.get(11)?.parse().ok()?;
            let stime: f64 = fields.get(12)?.parse().ok()?;
            Some((utime + stime) / 100.0)
        })
        .unwrap_or(0.0);
    let (alloc, heap) = std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| {
            let mut fields = statm.split_whitespace();
            let vsize: u64 = fields.next()?.parse().ok()?;
            let rss: u64 = fields.next()?.parse().ok()?;
            let page = 4096u64;
            Some((rss * page, vsize * page))
        })
        .unwrap_or((0, 0));
    (cpu, alloc, heap)
}
