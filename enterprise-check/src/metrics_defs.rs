//! Metrics definitions for the enterprise check.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Lookup request duration in seconds. Tagged with outcome.",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "upstream.duration",
    metric_type: MetricType::Histogram,
    description: "HubSpot call duration in seconds. Tagged with strategy, status.",
};

pub const LOOKUP_OUTCOME: MetricDef = MetricDef {
    name: "lookup.outcome",
    metric_type: MetricType::Counter,
    description: "Number of handled requests. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, UPSTREAM_DURATION, LOOKUP_OUTCOME];
