//! SQLite daemon store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;

use super::schema::init_schema;
use super::DaemonStore;
use crate::error::DaemonError;
use crate::types::{Daemon, DaemonDefinition, DaemonStatus, ExitInfo};

const SELECT_COLUMNS: &str =
    "SELECT key, command, working_directory, status, pid, exit_info, created_at, updated_at FROM daemons";

/// SQLite-backed daemon store. Each `put` is a synchronous, fully synced commit.
pub struct SqliteDaemonStore {
    conn: Connection,
}

impl SqliteDaemonStore {
    /// Open (or create) a file-backed store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DaemonError::Storage(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path.clone()).await?;
        conn.call(|conn| Ok(init_schema(conn)?)).await?;

        debug!("SqliteDaemonStore opened at {}", path.display());
        Ok(Self { conn })
    }

    /// Create a store backed by an in-memory database.
    pub async fn in_memory() -> Result<Self, DaemonError> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(Self { conn })
    }
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn row_to_daemon(row: &Row<'_>) -> rusqlite::Result<Daemon> {
    let key: String = row.get(0)?;
    let command: String = row.get(1)?;
    let working_directory: Option<String> = row.get(2)?;
    let status: String = row.get(3)?;
    let pid: Option<i64> = row.get(4)?;
    let exit_info: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    let status = status
        .parse::<DaemonStatus>()
        .map_err(|e| conversion_error(3, e))?;
    let exit = exit_info
        .map(|json| serde_json::from_str::<ExitInfo>(&json))
        .transpose()
        .map_err(|e| conversion_error(5, e))?;

    Ok(Daemon {
        definition: DaemonDefinition {
            key,
            command,
            working_directory: working_directory.map(PathBuf::from),
        },
        status,
        pid: pid.and_then(|p| u32::try_from(p).ok()),
        exit,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

#[async_trait]
impl DaemonStore for SqliteDaemonStore {
    async fn put(&self, daemon: &Daemon) -> Result<(), DaemonError> {
        let key = daemon.key().to_string();
        let command = daemon.definition.command.clone();
        let working_directory = daemon
            .definition
            .working_directory
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let status = daemon.status.as_str();
        let pid = daemon.pid.map(i64::from);
        let exit_info = daemon.exit.as_ref().map(serde_json::to_string).transpose()?;
        let created_at = daemon.created_at.to_rfc3339();
        let updated_at = daemon.updated_at.to_rfc3339();

        // The upsert keeps the original rowid, so listing stays in insertion order.
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO daemons (key, command, working_directory, status, pid, exit_info, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(key) DO UPDATE SET
                        command = excluded.command,
                        working_directory = excluded.working_directory,
                        status = excluded.status,
                        pid = excluded.pid,
                        exit_info = excluded.exit_info,
                        updated_at = excluded.updated_at",
                    params![key, command, working_directory, status, pid, exit_info, created_at, updated_at],
                )?;
                Ok(())
            })
            .await?;

        debug!("Stored daemon '{}' (status: {})", daemon.key(), daemon.status);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Daemon, DaemonError> {
        let lookup = key.to_string();
        let daemon = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{} WHERE key = ?1", SELECT_COLUMNS))?;
                Ok(stmt.query_row([&lookup], row_to_daemon).optional()?)
            })
            .await?;

        daemon.ok_or_else(|| DaemonError::NotFound(key.to_string()))
    }

    async fn list(&self) -> Result<Vec<Daemon>, DaemonError> {
        let daemons = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_COLUMNS))?;
                let rows = stmt.query_map([], row_to_daemon)?;
                let daemons = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(daemons)
            })
            .await?;

        Ok(daemons)
    }

    async fn exists(&self, key: &str) -> Result<bool, DaemonError> {
        let key = key.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT 1 FROM daemons WHERE key = ?1")?;
                Ok(stmt.exists([&key])?)
            })
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
