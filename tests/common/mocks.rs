use async_trait::async_trait;
use bytes::Bytes;
use mediasync::{
    AppError, BlobPath, BlobService, FsBlobService, LocalRecordStore, MemoryRemoteStore, Record,
    RecordRecovery, RemoteEntry, RemoteLocation, RemoteRecordDocument, RemoteRecordStore,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory remote that can be told to fail and that checks the local tier on every write.
pub struct FlakyRemoteStore {
    pub inner: MemoryRemoteStore,
    fail_writes: AtomicBool,
    write_attempts: AtomicUsize,
    local_watch: Mutex<Option<Arc<dyn LocalRecordStore>>>,
    ordering_checks: Mutex<Vec<bool>>,
}

impl FlakyRemoteStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryRemoteStore::new(),
            fail_writes: AtomicBool::new(false),
            write_attempts: AtomicUsize::new(0),
            local_watch: Mutex::new(None),
            ordering_checks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn successful_writes(&self) -> usize {
        self.inner.write_count()
    }

    pub fn watch_local(&self, local: Arc<dyn LocalRecordStore>) {
        *self.local_watch.lock().unwrap() = Some(local);
    }

    /// One entry per write: whether the local tier already held that version.
    pub fn ordering_checks(&self) -> Vec<bool> {
        self.ordering_checks.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteRecordStore for FlakyRemoteStore {
    async fn write(
        &self,
        location: RemoteLocation,
        document: &RemoteRecordDocument,
    ) -> Result<RemoteRecordDocument, AppError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let watched = self.local_watch.lock().unwrap().clone();
        if let Some(local) = watched {
            let present = local
                .get(&document.id)
                .await?
                .is_some_and(|record| record.updated_at >= document.updated_at);
            self.ordering_checks.lock().unwrap().push(present);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Network("remote unreachable".to_string()));
        }
        self.inner.write(location, document).await
    }

    async fn read(
        &self,
        owner_id: &str,
        id: &str,
        location: Option<RemoteLocation>,
    ) -> Result<Option<RemoteEntry>, AppError> {
        self.inner.read(owner_id, id, location).await
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError> {
        self.inner.delete(owner_id, id).await
    }

    async fn delete_at(
        &self,
        location: RemoteLocation,
        owner_id: &str,
        id: &str,
    ) -> Result<bool, AppError> {
        self.inner.delete_at(location, owner_id, id).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<RemoteEntry>, AppError> {
        self.inner.list_by_owner(owner_id).await
    }
}

/// Filesystem blob service that records every put and can fail on demand.
pub struct FlakyBlobService {
    pub inner: FsBlobService,
    fail_puts: AtomicBool,
    puts: Mutex<Vec<String>>,
}

impl FlakyBlobService {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsBlobService::new(root).expect("blob root"),
            fail_puts: AtomicBool::new(false),
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobService for FlakyBlobService {
    async fn put(
        &self,
        path: &BlobPath,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, AppError> {
        self.puts.lock().unwrap().push(path.as_key());
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Network("blob service unreachable".to_string()));
        }
        self.inner.put(path, content_type, bytes).await
    }

    async fn delete_record_blobs(&self, owner_id: &str, record_id: &str) -> Result<(), AppError> {
        self.inner.delete_record_blobs(owner_id, record_id).await
    }

    fn url_for(&self, path: &BlobPath) -> String {
        self.inner.url_for(path)
    }
}

/// Recovery collaborator that hands out a prepared record and counts calls.
#[derive(Default)]
pub struct RecordingRecovery {
    result: Mutex<Option<Result<Record, String>>>,
    calls: AtomicUsize,
}

impl RecordingRecovery {
    pub fn returning(record: Record) -> Self {
        Self {
            result: Mutex::new(Some(Ok(record))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Mutex::new(Some(Err(message.to_string()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordRecovery for RecordingRecovery {
    async fn recover(&self, _id: &str) -> Result<Option<Record>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.result.lock().unwrap().clone() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(message)) => Err(AppError::Internal(message)),
            None => Ok(None),
        }
    }
}
