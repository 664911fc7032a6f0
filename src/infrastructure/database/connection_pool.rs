use crate::shared::config::DatabaseConfig;
use crate::shared::error::AppError;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_MIGRATIONS_TABLE: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'";
const SELECT_APPLIED_VERSION: &str =
    "SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success = 1";

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        Self::connect(database_url, 5, Duration::from_secs(30)).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, AppError> {
        Self::connect(
            &config.url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout),
        )
        .await
    }

    /// 単一接続のメモリDB。接続ごとに別DBになるため1本に絞る
    pub async fn from_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|err| AppError::LocalStoreUnavailable(err.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|err| AppError::ConfigurationError(format!("{database_url}: {err}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        if let Some(parent) = Path::new(options.get_filename()).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    AppError::LocalStoreUnavailable(format!(
                        "Failed to create database directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|err| AppError::LocalStoreUnavailable(err.to_string()))?;

        info!("Database connected: {}", database_url);

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Latest schema version this build knows how to read.
    pub fn supported_schema_version() -> i64 {
        MIGRATOR
            .iter()
            .map(|migration| migration.version)
            .max()
            .unwrap_or(0)
    }

    /// Version recorded on disk, 0 for a fresh database.
    pub async fn schema_version(&self) -> Result<i64, AppError> {
        let has_table = sqlx::query(SELECT_MIGRATIONS_TABLE)
            .fetch_optional(self.get_pool())
            .await?
            .is_some();
        if !has_table {
            return Ok(0);
        }
        let version: i64 = sqlx::query_scalar(SELECT_APPLIED_VERSION)
            .fetch_one(self.get_pool())
            .await?;
        Ok(version)
    }

    /// Upgrades an older schema in place. A schema written by a newer build is fatal.
    pub async fn migrate(&self) -> Result<(), AppError> {
        let on_disk = self.schema_version().await?;
        let supported = Self::supported_schema_version();
        if on_disk > supported {
            return Err(AppError::LocalStoreUnavailable(format!(
                "on-disk schema version {on_disk} is newer than supported version {supported}"
            )));
        }

        info!(
            on_disk,
            supported, "Running database migrations..."
        );
        MIGRATOR.run(self.pool.as_ref()).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_url(dir: &TempDir, name: &str) -> String {
        format!("sqlite://{}?mode=rwc", dir.path().join(name).display())
    }

    #[tokio::test]
    async fn test_fresh_database_is_migrated_to_latest() {
        let temp_dir = TempDir::new().unwrap();
        let pool = ConnectionPool::new(&db_url(&temp_dir, "fresh.db"))
            .await
            .expect("connect");

        assert_eq!(pool.schema_version().await.unwrap(), 0);
        pool.migrate().await.expect("migrate");
        assert_eq!(
            pool.schema_version().await.unwrap(),
            ConnectionPool::supported_schema_version()
        );

        let table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='records'")
            .fetch_optional(pool.get_pool())
            .await
            .unwrap();
        assert!(table.is_some());

        pool.close().await;
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = ConnectionPool::new(&db_url(&temp_dir, "twice.db"))
            .await
            .unwrap();
        pool.migrate().await.unwrap();
        pool.migrate().await.unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("deeper").join("store.db");
        let url = format!("sqlite://{}?mode=rwc", nested.display());

        let pool = ConnectionPool::new(&url).await.expect("connect");
        pool.migrate().await.unwrap();
        assert!(nested.exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_memory_pool_migrates() {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        assert!(pool.schema_version().await.unwrap() > 0);
    }
}
