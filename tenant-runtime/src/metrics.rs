//! Pipeline metrics on an OpenTelemetry meter.
//!
//! Instruments are labeled by handler (the update kind) and tenant and exported by whichever
//! meter provider is installed globally; without one they are no-ops. Per-handler totals are
//! also tallied in process for the control plane.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};
use serde::Serialize;
use wbot_core::TenantId;

pub const METER_NAME: &str = "business-bot";

/// Totals of one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HandlerSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub panics: u64,
    pub dropped: u64,
}

/// Point-in-time view of [`RuntimeMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub events_total: u64,
    pub handler_errors_total: u64,
    pub panics_total: u64,
    pub dropped_total: u64,
    pub handlers: BTreeMap<String, HandlerSnapshot>,
}

pub struct RuntimeMetrics {
    requests: Counter<u64>,
    errors: Counter<u64>,
    panics: Counter<u64>,
    dropped: Counter<u64>,
    duration: Histogram<f64>,
    tallies: Mutex<BTreeMap<&'static str, HandlerSnapshot>>,
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn labels(tenant_id: TenantId, handler: &'static str) -> [KeyValue; 2] {
    [
        KeyValue::new("handler", handler),
        KeyValue::new("tenant_id", tenant_id),
    ]
}

impl RuntimeMetrics {
    /// Instruments from the global meter provider.
    pub fn new() -> Self {
        Self::with_meter(&global::meter(METER_NAME))
    }

    pub fn with_meter(meter: &Meter) -> Self {
        Self {
            requests: meter
                .u64_counter("bot_requests_total")
                .with_description("Total number of updates per handler")
                .build(),
            errors: meter
                .u64_counter("bot_errors_total")
                .with_description("Total number of failed updates per handler")
                .build(),
            panics: meter
                .u64_counter("bot_panics_total")
                .with_description("Total number of panics while handling updates")
                .build(),
            dropped: meter
                .u64_counter("bot_dropped_total")
                .with_description("Updates dropped because their queue was full")
                .build(),
            duration: meter
                .f64_histogram("bot_handler_duration_seconds")
                .with_description("Duration of handler execution")
                .with_unit("s")
                .build(),
            tallies: Mutex::new(BTreeMap::new()),
        }
    }

    fn tally(&self, handler: &'static str, bump: impl FnOnce(&mut HandlerSnapshot)) {
        let mut tallies = self.tallies.lock().unwrap_or_else(PoisonError::into_inner);
        bump(tallies.entry(handler).or_default());
    }

    pub fn record_request(&self, tenant_id: TenantId, handler: &'static str) {
        self.requests.add(1, &labels(tenant_id, handler));
        self.tally(handler, |t| t.requests += 1);
    }

    pub fn record_duration(&self, tenant_id: TenantId, handler: &'static str, elapsed: Duration) {
        self.duration
            .record(elapsed.as_secs_f64(), &labels(tenant_id, handler));
    }

    pub fn record_error(&self, tenant_id: TenantId, handler: &'static str) {
        self.errors.add(1, &labels(tenant_id, handler));
        self.tally(handler, |t| t.errors += 1);
    }

    pub fn record_panic(&self, tenant_id: TenantId, handler: &'static str) {
        self.panics.add(1, &labels(tenant_id, handler));
        self.tally(handler, |t| t.panics += 1);
    }

    pub fn record_dropped(&self, tenant_id: TenantId, handler: &'static str) {
        self.dropped.add(1, &labels(tenant_id, handler));
        self.tally(handler, |t| t.dropped += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let tallies = self.tallies.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = MetricsSnapshot::default();
        for (handler, tally) in tallies.iter() {
            snapshot.events_total += tally.requests;
            snapshot.handler_errors_total += tally.errors;
            snapshot.panics_total += tally.panics;
            snapshot.dropped_total += tally.dropped;
            snapshot.handlers.insert(handler.to_string(), *tally);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_sums_per_handler_tallies() {
        let metrics = RuntimeMetrics::new();
        metrics.record_request(1, "message");
        metrics.record_request(1, "edited_business_message");
        metrics.record_request(2, "message");
        metrics.record_panic(2, "message");
        metrics.record_dropped(1, "message");
        metrics.record_duration(1, "message", Duration::from_millis(20));

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.events_total, 3);
        assert_eq!(snapshot.panics_total, 1);
        assert_eq!(snapshot.dropped_total, 1);
        assert_eq!(snapshot.handler_errors_total, 0);
        assert_eq!(
            snapshot.handlers["message"],
            HandlerSnapshot {
                requests: 2,
                errors: 0,
                panics: 1,
                dropped: 1,
            }
        );
        assert_eq!(snapshot.handlers["edited_business_message"].requests, 1);
    }
}
