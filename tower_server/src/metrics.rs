//! Prometheus metrics for tower observability.

use metrics::counter;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a webhook received event.
pub fn webhook_received(event_type: &str) {
    counter!("tower_webhooks_received_total", "event" => event_type.to_string()).increment(1);
}

/// Record an actor invocation and whether it went through.
pub fn actor_dispatched(actor: &str, operation: &str, outcome: &str) {
    counter!(
        "tower_actor_dispatches_total",
        "actor" => actor.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a mutation refused because of the environment's status.
pub fn gate_rejected(operation: &str) {
    counter!("tower_gate_rejections_total", "operation" => operation.to_string()).increment(1);
}

/// Record a field filled from a default layer.
pub fn default_substituted(field: &str, source: &str) {
    counter!(
        "tower_default_substitutions_total",
        "field" => field.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
}
