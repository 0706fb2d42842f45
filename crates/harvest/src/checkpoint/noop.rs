//! Checkpoint store for stateless one-shot runs

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{FolderSyncTokenStore, LastSyncStore};
use crate::models::FolderId;

/// Never has a checkpoint and discards every write
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoints;

impl LastSyncStore for NoCheckpoints {
    fn last_synced(&self, _mailbox: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    fn set_last_synced(&self, _mailbox: &str, _instant: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

impl FolderSyncTokenStore for NoCheckpoints {
    fn sync_token(&self, _mailbox: &str, _folder: &FolderId) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_sync_token(&self, _mailbox: &str, _folder: &FolderId, _token: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_discarded() {
        let store = NoCheckpoints;
        let folder = FolderId::id("F1");

        store.set_sync_token("alice", &folder, "t1").unwrap();
        store.set_last_synced("alice", Utc::now()).unwrap();

        assert!(store.sync_token("alice", &folder).unwrap().is_none());
        assert!(store.last_synced("alice").unwrap().is_none());
    }
}
