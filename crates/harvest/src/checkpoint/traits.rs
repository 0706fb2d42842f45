//! Checkpoint trait definitions

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::FolderId;

/// Per-mailbox "last synced" instant
pub trait LastSyncStore: Send + Sync {
    /// When the mailbox last finished a full pass (None if never)
    fn last_synced(&self, mailbox: &str) -> Result<Option<DateTime<Utc>>>;

    fn set_last_synced(&self, mailbox: &str, instant: DateTime<Utc>) -> Result<()>;
}

/// Per-(mailbox, folder) opaque sync token
pub trait FolderSyncTokenStore: Send + Sync {
    /// Last committed token, None meaning "full sync"
    fn sync_token(&self, mailbox: &str, folder: &FolderId) -> Result<Option<String>>;

    fn set_sync_token(&self, mailbox: &str, folder: &FolderId, token: &str) -> Result<()>;
}
