//! In-memory checkpoint store
//!
//! Used by tests and by callers that reuse one process for several runs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{FolderSyncTokenStore, LastSyncStore};
use crate::models::FolderId;

/// HashMaps behind RwLocks, safe to share across mailbox workers
#[derive(Default)]
pub struct InMemoryCheckpoints {
    last_synced: RwLock<HashMap<String, DateTime<Utc>>>,
    sync_tokens: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LastSyncStore for InMemoryCheckpoints {
    fn last_synced(&self, mailbox: &str) -> Result<Option<DateTime<Utc>>> {
        let last_synced = self.last_synced.read().unwrap();
        Ok(last_synced.get(mailbox).copied())
    }

    fn set_last_synced(&self, mailbox: &str, instant: DateTime<Utc>) -> Result<()> {
        let mut last_synced = self.last_synced.write().unwrap();
        last_synced.insert(mailbox.to_string(), instant);
        Ok(())
    }
}

impl FolderSyncTokenStore for InMemoryCheckpoints {
    fn sync_token(&self, mailbox: &str, folder: &FolderId) -> Result<Option<String>> {
        let tokens = self.sync_tokens.read().unwrap();
        Ok(tokens
            .get(&(mailbox.to_string(), folder.storage_key()))
            .cloned())
    }

    fn set_sync_token(&self, mailbox: &str, folder: &FolderId, token: &str) -> Result<()> {
        let mut tokens = self.sync_tokens.write().unwrap();
        tokens.insert(
            (mailbox.to_string(), folder.storage_key()),
            token.to_string(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WellKnownFolder;

    #[test]
    fn test_sync_tokens_are_scoped_per_mailbox_and_folder() {
        let store = InMemoryCheckpoints::new();
        let inbox = FolderId::WellKnown(WellKnownFolder::Inbox);
        let other = FolderId::id("F1");

        store.set_sync_token("alice", &inbox, "a-inbox").unwrap();
        store.set_sync_token("bob", &inbox, "b-inbox").unwrap();

        assert_eq!(store.sync_token("alice", &inbox).unwrap().as_deref(), Some("a-inbox"));
        assert_eq!(store.sync_token("bob", &inbox).unwrap().as_deref(), Some("b-inbox"));
        assert!(store.sync_token("alice", &other).unwrap().is_none());
    }

    #[test]
    fn test_last_synced_roundtrip() {
        let store = InMemoryCheckpoints::new();
        assert!(store.last_synced("alice").unwrap().is_none());

        let now = Utc::now();
        store.set_last_synced("alice", now).unwrap();
        assert_eq!(store.last_synced("alice").unwrap(), Some(now));
    }
}
