//! Connection pool setup and embedded schema migrations.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool against `database_url` and bring the schema up to date.
///
/// In-memory databases live only as long as their connection, so they are
/// pinned to a single connection that is never recycled.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?
    };

    MIGRATOR.run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// A throwaway file-backed database for tests that need several live
/// connections. The files are removed on drop.
#[cfg(test)]
pub(crate) struct TempDatabase {
    pub pool: SqlitePool,
    path: std::path::PathBuf,
}

#[cfg(test)]
impl TempDatabase {
    pub async fn connect(max_connections: u32) -> Result<Self, sqlx::Error> {
        let path = std::env::temp_dir().join(format!("campus-auth-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = connect(&url, max_connections).await?;
        Ok(Self { pool, path })
    }
}

#[cfg(test)]
impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_applies_migrations() {
        let pool = connect("sqlite::memory:", 5).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

        for expected in [
            "auth_events",
            "blacklisted_tokens",
            "outstanding_tokens",
            "students",
            "teachers",
        ] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_file_database_uses_several_connections() {
        let db = TempDatabase::connect(4).await.unwrap();

        let first = db.pool.acquire().await.unwrap();
        let second = db.pool.acquire().await.unwrap();
        assert_eq!(db.pool.size(), 2);
        drop((first, second));

        let foreign_keys: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys.0, 1);
    }

    #[tokio::test]
    async fn test_connect_twice_is_idempotent() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        MIGRATOR.run(&pool).await.unwrap();
    }
}
