//! Observability infrastructure

pub mod metrics;

pub use metrics::{
    COST_MICRO_USD_SCALE, CacheEvent, CacheSnapshot, PrometheusMetrics, QueryMetrics, init_metrics,
};
