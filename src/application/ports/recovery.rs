use crate::domain::entities::Record;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Best-effort repair for an id that neither tier knows about.
#[async_trait]
pub trait RecordRecovery: Send + Sync {
    async fn recover(&self, id: &str) -> Result<Option<Record>, AppError>;
}

pub struct NoopRecovery;

#[async_trait]
impl RecordRecovery for NoopRecovery {
    async fn recover(&self, _id: &str) -> Result<Option<Record>, AppError> {
        Ok(None)
    }
}
