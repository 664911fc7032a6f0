use super::lifecycle::LifecyclePolicy;
use super::media_session::MediaSessionRegistry;
use super::upload_pipeline::UploadPipeline;
use crate::application::ports::{
    AuthProvider, BlobService, Identity, LocalRecordStore, RecordRecovery, RemoteEntry,
    RemoteRecordStore,
};
use crate::application::shared::mappers::{entry_to_record, record_to_document};
use crate::domain::entities::Record;
use crate::domain::value_objects::blob_path::validate_segment;
use crate::domain::value_objects::{LifecycleState, RemoteLocation};
use crate::infrastructure::codec::BlobCodec;
use crate::infrastructure::metrics::{SyncMetrics, SyncMetricsSnapshot};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use chrono::{SubsecRound, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// Stages a single save passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Idle,
    Validating,
    LocalPersisting,
    Uploading,
    RemoteWriting,
    Failed,
}

impl SaveStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStage::Idle => "idle",
            SaveStage::Validating => "validating",
            SaveStage::LocalPersisting => "local_persisting",
            SaveStage::Uploading => "uploading",
            SaveStage::RemoteWriting => "remote_writing",
            SaveStage::Failed => "failed",
        }
    }
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The record as the local store holds it after the save.
    pub record: Record,
    pub remote_synced: bool,
    pub uploaded_assets: usize,
    pub stages: Vec<SaveStage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Local,
    Remote,
    Recovery,
}

#[derive(Debug, Clone)]
pub struct LoadedRecord {
    pub record: Record,
    pub source: LoadSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub pulled: usize,
    pub inserted: usize,
    pub overwritten: usize,
    pub preserved_local_only: usize,
}

/// Per-tier result of a delete; each tier is attempted regardless of the other.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub local: Result<bool, AppError>,
    pub remote: Result<bool, AppError>,
}

impl DeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.local.is_ok() && self.remote.is_ok()
    }
}

/// Ports the coordinator talks to.
pub struct SyncCollaborators {
    pub local: Arc<dyn LocalRecordStore>,
    pub remote: Arc<dyn RemoteRecordStore>,
    pub blobs: Arc<dyn BlobService>,
    pub auth: Arc<dyn AuthProvider>,
    pub recovery: Arc<dyn RecordRecovery>,
}

type SaveLocks = StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Holds the per-record save lock; the map entry is dropped with the last holder.
struct SaveLockGuard<'a> {
    locks: &'a SaveLocks,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SaveLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(self.locks);
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

fn lock_map(locks: &SaveLocks) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
    locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SyncCoordinator {
    local: Arc<dyn LocalRecordStore>,
    remote: Arc<dyn RemoteRecordStore>,
    blobs: Arc<dyn BlobService>,
    auth: Arc<dyn AuthProvider>,
    recovery: Arc<dyn RecordRecovery>,
    uploads: UploadPipeline,
    policy: LifecyclePolicy,
    sessions: Arc<MediaSessionRegistry>,
    metrics: Arc<SyncMetrics>,
    save_locks: SaveLocks,
}

impl SyncCoordinator {
    pub fn new(
        collaborators: SyncCollaborators,
        codec: BlobCodec,
        config: &SyncConfig,
        sessions: Arc<MediaSessionRegistry>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        let uploads = UploadPipeline::new(
            Arc::clone(&collaborators.blobs),
            codec,
            config.upload_concurrency,
            Arc::clone(&metrics),
        );
        Self {
            local: collaborators.local,
            remote: collaborators.remote,
            blobs: collaborators.blobs,
            auth: collaborators.auth,
            recovery: collaborators.recovery,
            uploads,
            policy: LifecyclePolicy::new(config.min_media_count),
            sessions,
            metrics,
            save_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    pub fn sessions(&self) -> &Arc<MediaSessionRegistry> {
        &self.sessions
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn acquire(&self, id: &str) -> SaveLockGuard<'_> {
        let lock = {
            let mut locks = lock_map(&self.save_locks);
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        SaveLockGuard {
            locks: &self.save_locks,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Remote tier operations act on behalf of the signed-in owner only.
    async fn require_identity(&self, owner_id: Option<&str>) -> Result<Identity, AppError> {
        let identity = self
            .auth
            .current_identity()
            .await
            .ok_or_else(|| AppError::NotAuthenticated("no signed-in user".to_string()))?;
        if let Some(owner_id) = owner_id {
            if identity.owner_id != owner_id {
                return Err(AppError::NotAuthenticated(format!(
                    "signed in as {}, record belongs to {owner_id}",
                    identity.owner_id
                )));
            }
        }
        Ok(identity)
    }

    fn fail(&self, record_id: &str, stages: &mut Vec<SaveStage>, err: AppError) -> AppError {
        let stage = stages.last().copied().unwrap_or(SaveStage::Idle);
        stages.push(SaveStage::Failed);
        self.metrics.record_failure(stage.as_str(), &err.to_string());
        if err.is_remote_failure() || matches!(err, AppError::NotAuthenticated(_)) {
            warn!(record_id, stage = %stage, "Save stopped after local write: {}", err);
        } else {
            error!(record_id, stage = %stage, "Save failed: {}", err);
        }
        err
    }

    /// Persists locally, then, for private and posted records, uploads media and writes the
    /// remote document. A remote failure leaves the local write in place.
    pub async fn save(&self, record: Record) -> Result<SaveOutcome, AppError> {
        let _lock = self.acquire(&record.id).await;
        self.save_locked(record).await
    }

    async fn save_locked(&self, record: Record) -> Result<SaveOutcome, AppError> {
        self.metrics.record_save_started();
        let record_id = record.id.clone();
        let mut stages = vec![SaveStage::Idle, SaveStage::Validating];

        if let Err(err) = check_record_key(&record.owner_id, &record_id) {
            return Err(self.fail(&record_id, &mut stages, err));
        }

        let current = match self.local.get(&record_id).await {
            Ok(existing) => existing.map(|existing| existing.lifecycle_state),
            Err(err) => return Err(self.fail(&record_id, &mut stages, err)),
        };
        if let Err(err) = self.policy.check_save(current, &record) {
            return Err(self.fail(&record_id, &mut stages, err));
        }

        stages.push(SaveStage::LocalPersisting);
        let stored = match self.local.put(&record).await {
            Ok(stored) => stored,
            Err(err) => return Err(self.fail(&record_id, &mut stages, err)),
        };
        self.metrics.record_local_save();
        debug!(record_id = %record_id, state = %stored.lifecycle_state, "Local write committed");

        let Some(location) = stored.lifecycle_state.remote_location() else {
            stages.push(SaveStage::Idle);
            return Ok(SaveOutcome {
                record: stored,
                remote_synced: false,
                uploaded_assets: 0,
                stages,
            });
        };

        if let Err(err) = self.require_identity(Some(&stored.owner_id)).await {
            return Err(self.fail(&record_id, &mut stages, err));
        }

        stages.push(SaveStage::Uploading);
        let pending_uploads = stored.assets.iter().filter(|asset| !asset.is_referenced()).count();
        let assets = match self.uploads.upload_record(&stored).await {
            Ok(assets) => assets,
            Err(err) => return Err(self.fail(&record_id, &mut stages, err)),
        };
        let mut synced = stored;
        synced.assets = assets;

        stages.push(SaveStage::RemoteWriting);
        let document = match record_to_document(&synced) {
            Ok(document) => document,
            Err(err) => return Err(self.fail(&record_id, &mut stages, err)),
        };
        if let Err(err) = self.remote.write(location, &document).await {
            let err = match err {
                AppError::RemoteWriteFailed(_) => err,
                other => AppError::RemoteWriteFailed(other.to_string()),
            };
            return Err(self.fail(&record_id, &mut stages, err));
        }
        self.metrics.record_remote_save();
        info!(
            record_id = %record_id,
            location = location.as_str(),
            uploaded = pending_uploads,
            "Remote write committed"
        );

        if location == RemoteLocation::Public && current != Some(LifecycleState::Posted) {
            self.drop_private_copy(&synced.owner_id, &record_id).await;
        }

        let synced_at = Utc::now().trunc_subsecs(3);
        synced.remote_synced_at = Some(synced_at);
        let cached = if pending_uploads == 0 {
            // 参照は変わっていないので同期時刻だけ更新する
            self.local
                .mark_remote_synced(&record_id, synced_at)
                .await
                .map(|()| synced.clone())
        } else {
            // 参照URLをローカルへ書き戻す。失敗しても次回の保存で再アップロードされるだけ
            self.local.put(&synced).await
        };
        let record = match cached {
            Ok(cached) => cached,
            Err(err) => {
                warn!(record_id = %record_id, "Failed to cache sync result locally: {}", err);
                synced
            }
        };

        stages.push(SaveStage::Idle);
        Ok(SaveOutcome {
            record,
            remote_synced: true,
            uploaded_assets: pending_uploads,
            stages,
        })
    }

    async fn drop_private_copy(&self, owner_id: &str, record_id: &str) {
        match self
            .remote
            .delete_at(RemoteLocation::Private, owner_id, record_id)
            .await
        {
            Ok(true) => debug!(record_id, "Removed private copy after publish"),
            Ok(false) => {}
            Err(err) => warn!(record_id, "Failed to remove private copy after publish: {}", err),
        }
    }

    /// Local first, then the remote tier of the signed-in owner, then one recovery attempt.
    pub async fn load(&self, id: &str) -> Result<LoadedRecord, AppError> {
        check_id(id)?;
        if let Some(record) = self.local.get(id).await? {
            return Ok(LoadedRecord {
                record,
                source: LoadSource::Local,
            });
        }

        let identity = self.require_identity(None).await?;
        if let Some(entry) = self.remote.read(&identity.owner_id, id, None).await? {
            self.metrics.record_remote_load();
            let record = entry_to_record(&entry);
            let record = match self.local.put(&record).await {
                Ok(cached) => cached,
                Err(err) => {
                    warn!(record_id = id, "Failed to cache remote record locally: {}", err);
                    record
                }
            };
            debug!(record_id = id, location = entry.location.as_str(), "Loaded from remote");
            return Ok(LoadedRecord {
                record,
                source: LoadSource::Remote,
            });
        }

        match self.recovery.recover(id).await {
            Ok(Some(record)) => {
                self.metrics.record_recovery();
                let record = self.local.put(&record).await?;
                info!(record_id = id, "Record recovered");
                Ok(LoadedRecord {
                    record,
                    source: LoadSource::Recovery,
                })
            }
            Ok(None) => Err(AppError::NotFound(format!("record {id}"))),
            Err(err) => {
                warn!(record_id = id, "Recovery failed: {}", err);
                Err(AppError::NotFound(format!("record {id}")))
            }
        }
    }

    /// Pulls every remote record of `owner_id` into the local store. Remote wins for shared ids;
    /// records that only exist locally are left alone.
    pub async fn reconcile_all(&self, owner_id: &str) -> Result<ReconcileReport, AppError> {
        validate_segment("owner id", owner_id).map_err(AppError::ValidationError)?;
        let identity = self.require_identity(Some(owner_id)).await?;
        let entries = dedupe_entries(self.remote.list_by_owner(&identity.owner_id).await?)
            .into_iter()
            .filter(|entry| match check_id(&entry.document.id) {
                Ok(()) => true,
                Err(err) => {
                    warn!(owner_id, "Skipping remote record: {}", err);
                    false
                }
            })
            .collect::<Vec<_>>();

        let local_ids: HashSet<String> = self
            .local
            .list_by_owner(owner_id, None)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        let mut report = ReconcileReport {
            pulled: entries.len(),
            ..ReconcileReport::default()
        };
        let mut remote_ids = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let record = entry_to_record(entry);
            let _lock = self.acquire(&record.id).await;
            self.local.put(&record).await?;
            if local_ids.contains(&record.id) {
                report.overwritten += 1;
            } else {
                report.inserted += 1;
            }
            remote_ids.insert(record.id);
        }
        report.preserved_local_only = local_ids.difference(&remote_ids).count();

        self.metrics.record_reconciled(report.pulled as u64);
        info!(
            owner_id,
            pulled = report.pulled,
            inserted = report.inserted,
            overwritten = report.overwritten,
            preserved = report.preserved_local_only,
            "Reconciliation finished"
        );
        Ok(report)
    }

    pub async fn publish(&self, id: &str) -> Result<SaveOutcome, AppError> {
        self.transition_and_save(id, LifecycleState::Posted).await
    }

    pub async fn make_private(&self, id: &str) -> Result<SaveOutcome, AppError> {
        self.transition_and_save(id, LifecycleState::Private).await
    }

    async fn transition_and_save(
        &self,
        id: &str,
        target: LifecycleState,
    ) -> Result<SaveOutcome, AppError> {
        check_id(id)?;
        let _lock = self.acquire(id).await;
        let mut record = self
            .local
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record {id}")))?;
        self.policy.transition(&mut record, target)?;
        self.save_locked(record).await
    }

    /// Deletes from both tiers independently and stops any session playing the record.
    pub async fn delete(&self, id: &str) -> DeleteOutcome {
        if let Err(reason) = validate_segment("record id", id) {
            warn!(record_id = id, "Refusing to delete: {}", reason);
            return DeleteOutcome {
                local: Err(AppError::ValidationError(reason.clone())),
                remote: Err(AppError::ValidationError(reason)),
            };
        }

        let stopped = self.sessions.stop_for_record(id);
        if !stopped.is_empty() {
            debug!(record_id = id, sessions = stopped.len(), "Stopped sessions of deleted record");
        }

        let _lock = self.acquire(id).await;
        let local = self.local.delete(id).await;
        let remote = match self.require_identity(None).await {
            Ok(identity) => {
                let removed = self.remote.delete(&identity.owner_id, id).await;
                if let Err(err) = self.blobs.delete_record_blobs(&identity.owner_id, id).await {
                    warn!(record_id = id, "Failed to delete record blobs: {}", err);
                }
                removed
            }
            Err(err) => Err(err),
        };

        match (&local, &remote) {
            (Ok(_), Ok(_)) => info!(record_id = id, "Record deleted"),
            _ => warn!(
                record_id = id,
                local_ok = local.is_ok(),
                remote_ok = remote.is_ok(),
                "Record delete incomplete"
            ),
        }
        DeleteOutcome { local, remote }
    }

    pub async fn list_local(
        &self,
        owner_id: &str,
        state: Option<LifecycleState>,
    ) -> Result<Vec<Record>, AppError> {
        self.local.list_by_owner(owner_id, state).await
    }
}

fn check_id(id: &str) -> Result<(), AppError> {
    validate_segment("record id", id).map_err(AppError::ValidationError)
}

fn check_record_key(owner_id: &str, id: &str) -> Result<(), AppError> {
    validate_segment("owner id", owner_id).map_err(AppError::ValidationError)?;
    check_id(id)
}

/// 同じIDが両方の場所にある場合は非公開側を残す
fn dedupe_entries(entries: Vec<RemoteEntry>) -> Vec<RemoteEntry> {
    let mut by_id: HashMap<String, RemoteEntry> = HashMap::with_capacity(entries.len());
    for entry in entries {
        match by_id.get(&entry.document.id) {
            Some(existing) if !supersedes(&entry, existing) => {}
            _ => {
                by_id.insert(entry.document.id.clone(), entry);
            }
        }
    }
    let mut deduped: Vec<RemoteEntry> = by_id.into_values().collect();
    deduped.sort_by(|a, b| a.document.id.cmp(&b.document.id));
    deduped
}

fn supersedes(candidate: &RemoteEntry, existing: &RemoteEntry) -> bool {
    candidate.location == RemoteLocation::Private && existing.location == RemoteLocation::Public
}
