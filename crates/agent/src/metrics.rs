//! Engine metrics
//!
//! Recorded through the `metrics` facade; the server installs the Prometheus
//! recorder. Without a recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

pub const INBOUND_TOTAL: &str = "lead_qualifier_inbound_total";
pub const COMPLETIONS_TOTAL: &str = "lead_qualifier_completions_total";
pub const CHANNEL_FAILURES_TOTAL: &str = "lead_qualifier_channel_failures_total";
pub const DELIVERY_FAILURES_TOTAL: &str = "lead_qualifier_delivery_failures_total";
pub const TURN_LATENCY_SECONDS: &str = "lead_qualifier_turn_latency_seconds";

/// Register metric descriptions; call once after the recorder is installed
pub fn register_metrics() {
    describe_counter!(INBOUND_TOTAL, "Inbound messages received");
    describe_counter!(COMPLETIONS_TOTAL, "Qualifications completed, by verdict");
    describe_counter!(CHANNEL_FAILURES_TOTAL, "Notification channel failures");
    describe_counter!(DELIVERY_FAILURES_TOTAL, "Outbound messages the transport did not deliver");
    describe_histogram!(TURN_LATENCY_SECONDS, "Inbound message handling latency");
}

pub fn record_inbound() {
    counter!(INBOUND_TOTAL).increment(1);
}

pub fn record_completion(qualified: bool) {
    let label = if qualified { "true" } else { "false" };
    counter!(COMPLETIONS_TOTAL, "qualified" => label).increment(1);
}

pub fn record_channel_failure(channel: &str) {
    counter!(CHANNEL_FAILURES_TOTAL, "channel" => channel.to_string()).increment(1);
}

pub fn record_delivery_failure() {
    counter!(DELIVERY_FAILURES_TOTAL).increment(1);
}

pub fn record_turn_latency(elapsed: Duration) {
    histogram!(TURN_LATENCY_SECONDS).record(elapsed.as_secs_f64());
}
