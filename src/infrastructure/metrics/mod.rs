pub mod sync_metrics;

pub use sync_metrics::{SyncMetrics, SyncMetricsSnapshot};
