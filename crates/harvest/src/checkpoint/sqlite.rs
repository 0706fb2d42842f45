//! SQLite-backed checkpoint store

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::{FolderSyncTokenStore, LastSyncStore};
use crate::models::FolderId;

/// Database migrations
///
/// Applied in order; the user_version pragma tracks which have run.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        -- Last completed pass per mailbox
        CREATE TABLE mailbox_sync (
            mailbox TEXT PRIMARY KEY,
            last_synced_at TEXT NOT NULL
        );

        -- Committed sync token per mailbox folder
        CREATE TABLE folder_sync (
            mailbox TEXT NOT NULL,
            folder_key TEXT NOT NULL,
            sync_token TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (mailbox, folder_key)
        );
        "#,
    )])
}

/// Durable checkpoints for repeated incremental runs
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    /// Open (or create) the checkpoint database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open checkpoint database at {:?}", db_path.as_ref()))?;

        // WAL keeps a crashed run from corrupting committed checkpoints
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        Self::from_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migrations()
            .to_latest(&mut conn)
            .context("Failed to run checkpoint migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LastSyncStore for SqliteCheckpointStore {
    fn last_synced(&self, mailbox: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();

        let raw: Option<String> = conn
            .query_row(
                "SELECT last_synced_at FROM mailbox_sync WHERE mailbox = ?",
                [mailbox],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Corrupt last_synced_at for {}: {}", mailbox, s))
        })
        .transpose()
    }

    fn set_last_synced(&self, mailbox: &str, instant: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO mailbox_sync (mailbox, last_synced_at) VALUES (?, ?)",
            params![mailbox, instant.to_rfc3339()],
        )?;
        Ok(())
    }
}

impl FolderSyncTokenStore for SqliteCheckpointStore {
    fn sync_token(&self, mailbox: &str, folder: &FolderId) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT sync_token FROM folder_sync WHERE mailbox = ? AND folder_key = ?",
                params![mailbox, folder.storage_key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    fn set_sync_token(&self, mailbox: &str, folder: &FolderId, token: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO folder_sync (mailbox, folder_key, sync_token, updated_at)
             VALUES (?, ?, ?, ?)",
            params![mailbox, folder.storage_key(), token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WellKnownFolder;
    use tempfile::tempdir;

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_sync_token_upsert() {
        let store = SqliteCheckpointStore::open_in_memory().unwrap();
        let folder = FolderId::id("AAMkF1");

        assert!(store.sync_token("alice", &folder).unwrap().is_none());

        store.set_sync_token("alice", &folder, "t1").unwrap();
        store.set_sync_token("alice", &folder, "t2").unwrap();

        assert_eq!(store.sync_token("alice", &folder).unwrap().as_deref(), Some("t2"));
        assert!(
            store
                .sync_token("alice", &FolderId::WellKnown(WellKnownFolder::Inbox))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_checkpoints_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("checkpoints.test.sqlite");
        let folder = FolderId::WellKnown(WellKnownFolder::Inbox);
        let instant = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        {
            let store = SqliteCheckpointStore::open(&db_path).unwrap();
            store.set_sync_token("bob", &folder, "H4sI").unwrap();
            store.set_last_synced("bob", instant).unwrap();
        }

        let store = SqliteCheckpointStore::open(&db_path).unwrap();
        assert_eq!(store.sync_token("bob", &folder).unwrap().as_deref(), Some("H4sI"));
        assert_eq!(store.last_synced("bob").unwrap(), Some(instant));
    }
}
