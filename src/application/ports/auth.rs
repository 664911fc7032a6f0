use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(owner_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Supplies the signed-in owner. Remote operations require one.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_identity(&self) -> Option<Identity>;
}
