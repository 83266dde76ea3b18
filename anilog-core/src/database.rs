use crate::common::error::{Result, StoreError};
use libsql::{Builder, Connection, Database};
use tracing::info;

pub struct DatabaseManager {
    db: Database,
}

fn is_remote(url: &str) -> bool {
    url.starts_with("libsql://") || url.starts_with("http://") || url.starts_with("https://")
}

impl DatabaseManager {
    /// Connect to a Turso/libSQL URL or a local database file path.
    pub async fn connect(url: &str, auth_token: Option<String>) -> Result<Self> {
        let db = if is_remote(url) {
            let auth_token = auth_token.ok_or_else(|| {
                StoreError::database("LIBSQL_AUTH_TOKEN is required for remote databases")
            })?;

            info!("Connecting to Turso database at {}", url);
            Builder::new_remote(url.to_string(), auth_token)
                .build()
                .await
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            info!("Opening local database at {}", path);
            Builder::new_local(path).build().await
        }
        .map_err(|e| StoreError::database(format!("Failed to connect to database: {e}")))?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| StoreError::database(format!("Failed to get database connection: {e}")))
    }

    /// Run database migrations. Every statement is idempotent.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;

        let migration_sql_001 = include_str!("../migrations/001_create_tables.sql");
        conn.execute_batch(migration_sql_001)
            .await
            .map_err(|e| StoreError::database(format!("Failed to run base migration: {e}")))?;

        let migration_sql_002 = include_str!("../migrations/002_indexes.sql");
        conn.execute_batch(migration_sql_002)
            .await
            .map_err(|e| StoreError::database(format!("Failed to run index migration: {e}")))?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_detection() {
        assert!(is_remote("libsql://anilog.turso.io"));
        assert!(is_remote("https://anilog.turso.io"));
        assert!(!is_remote("anilog.db"));
        assert!(!is_remote("file:data/anilog.db"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anilog.db");
        let manager = DatabaseManager::connect(path.to_str().unwrap(), None)
            .await
            .unwrap();

        manager.run_migrations().await.unwrap();
        manager.run_migrations().await.unwrap();
    }
}
