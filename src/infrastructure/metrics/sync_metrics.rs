use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub saves_started: u64,
    pub local_saves: u64,
    pub remote_saves: u64,
    pub failed_saves: u64,
    pub assets_uploaded: u64,
    pub upload_failures: u64,
    pub remote_loads: u64,
    pub recoveries: u64,
    pub reconciled_records: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_failure_stage: Option<String>,
    pub last_failure_error: Option<String>,
}

#[derive(Default, Clone)]
struct LastFailure {
    stage: Option<String>,
    error: Option<String>,
}

/// 同期処理の結果カウンタ。エンジンごとに1つ保持する
#[derive(Default)]
pub struct SyncMetrics {
    saves_started: AtomicU64,
    local_saves: AtomicU64,
    remote_saves: AtomicU64,
    failed_saves: AtomicU64,
    assets_uploaded: AtomicU64,
    upload_failures: AtomicU64,
    remote_loads: AtomicU64,
    recoveries: AtomicU64,
    reconciled_records: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last_failure: Mutex<LastFailure>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_save_started(&self) {
        self.saves_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_save(&self) {
        self.local_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_save(&self) {
        self.remote_saves.fetch_add(1, Ordering::Relaxed);
        self.last_success_ms
            .store(current_unix_ms(), Ordering::Relaxed);
    }

    pub fn record_uploads(&self, succeeded: u64, failed: u64) {
        self.assets_uploaded.fetch_add(succeeded, Ordering::Relaxed);
        self.upload_failures.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn record_remote_load(&self) {
        self.remote_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconciled(&self, count: u64) {
        self.reconciled_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failure(&self, stage: &str, error: &str) {
        self.failed_saves.fetch_add(1, Ordering::Relaxed);
        self.last_failure_ms
            .store(current_unix_ms(), Ordering::Relaxed);
        if let Ok(mut guard) = self.last_failure.lock() {
            guard.stage = Some(stage.to_string());
            guard.error = Some(error.to_string());
        }
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let last_failure = self
            .last_failure
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            saves_started: self.saves_started.load(Ordering::Relaxed),
            local_saves: self.local_saves.load(Ordering::Relaxed),
            remote_saves: self.remote_saves.load(Ordering::Relaxed),
            failed_saves: self.failed_saves.load(Ordering::Relaxed),
            assets_uploaded: self.assets_uploaded.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            remote_loads: self.remote_loads.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            reconciled_records: self.reconciled_records.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_failure_stage: last_failure.stage,
            last_failure_error: last_failure.error,
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_success_and_failure() {
        let metrics = SyncMetrics::new();
        metrics.record_save_started();
        metrics.record_local_save();
        metrics.record_uploads(2, 0);
        metrics.record_remote_save();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.saves_started, 1);
        assert_eq!(snapshot.remote_saves, 1);
        assert_eq!(snapshot.assets_uploaded, 2);
        assert!(snapshot.last_success_ms.is_some());
        assert!(snapshot.last_failure_stage.is_none());

        metrics.record_failure("uploading", "Upload failed: boom");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed_saves, 1);
        assert_eq!(snapshot.last_failure_stage.as_deref(), Some("uploading"));
        assert_eq!(
            snapshot.last_failure_error.as_deref(),
            Some("Upload failed: boom")
        );
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(SyncMetrics::new().snapshot()).unwrap();
        assert!(json.get("savesStarted").is_some());
        assert!(json.get("lastFailureStage").is_some());
    }
}
