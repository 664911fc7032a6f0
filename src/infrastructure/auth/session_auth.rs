use crate::application::ports::{AuthProvider, Identity};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// Holds the identity of the signed-in user for the lifetime of the process.
#[derive(Default)]
pub struct SessionAuthProvider {
    current: RwLock<Option<Identity>>,
}

impl SessionAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    pub async fn sign_in(&self, identity: Identity) {
        info!(owner_id = %identity.owner_id, "Signed in");
        *self.current.write().await = Some(identity);
    }

    pub async fn sign_out(&self) {
        if let Some(previous) = self.current.write().await.take() {
            info!(owner_id = %previous.owner_id, "Signed out");
        }
    }
}

#[async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn current_identity(&self) -> Option<Identity> {
        self.current.read().await.clone()
    }
}
