//! Immutable per-run paging parameters and checkpoint stores

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checkpoint::{FolderSyncTokenStore, LastSyncStore, NoCheckpoints};

/// Which checkpoint drives incremental paging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Per-folder sync token, resumed with the server's sync operation
    #[default]
    SyncToken,
    /// Per-mailbox "last synced" instant, applied as a changed-since filter
    /// over offset paging
    LastSynced,
}

/// Shared, read-only configuration for one harvest run
#[derive(Clone)]
pub struct RunConfig {
    folder_id_page_size: usize,
    item_detail_page_size: usize,
    mode: SyncMode,
    last_sync_store: Arc<dyn LastSyncStore>,
    folder_sync_token_store: Arc<dyn FolderSyncTokenStore>,
}

/// Page sizes below 1 mean 1, never "unbounded"
fn clamp_page_size(requested: i64) -> usize {
    usize::try_from(requested.max(1)).unwrap_or(usize::MAX)
}

impl RunConfig {
    pub fn new(
        folder_id_page_size: i64,
        item_detail_page_size: i64,
        last_sync_store: Arc<dyn LastSyncStore>,
        folder_sync_token_store: Arc<dyn FolderSyncTokenStore>,
    ) -> Self {
        Self {
            folder_id_page_size: clamp_page_size(folder_id_page_size),
            item_detail_page_size: clamp_page_size(item_detail_page_size),
            mode: SyncMode::default(),
            last_sync_store,
            folder_sync_token_store,
        }
    }

    /// Config that never reads or persists checkpoints
    pub fn stateless(folder_id_page_size: i64, item_detail_page_size: i64) -> Self {
        let store = Arc::new(NoCheckpoints);
        Self::new(folder_id_page_size, item_detail_page_size, store.clone(), store)
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same config with a different last-synced store
    pub fn with_last_sync_store(&self, store: Arc<dyn LastSyncStore>) -> Self {
        Self {
            last_sync_store: store,
            ..self.clone()
        }
    }

    /// Same config with a different folder sync-token store
    pub fn with_folder_sync_token_store(&self, store: Arc<dyn FolderSyncTokenStore>) -> Self {
        Self {
            folder_sync_token_store: store,
            ..self.clone()
        }
    }

    pub fn folder_id_page_size(&self) -> usize {
        self.folder_id_page_size
    }

    pub fn item_detail_page_size(&self) -> usize {
        self.item_detail_page_size
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn last_sync_store(&self) -> &dyn LastSyncStore {
        self.last_sync_store.as_ref()
    }

    pub fn folder_sync_token_store(&self) -> &dyn FolderSyncTokenStore {
        self.folder_sync_token_store.as_ref()
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("folder_id_page_size", &self.folder_id_page_size)
            .field("item_detail_page_size", &self.item_detail_page_size)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpoints;
    use crate::models::FolderId;

    #[test]
    fn test_page_sizes_clamp_to_one() {
        for requested in [0, -1, -500, i64::MIN] {
            let config = RunConfig::stateless(requested, requested);
            assert_eq!(config.folder_id_page_size(), 1);
            assert_eq!(config.item_detail_page_size(), 1);
        }
    }

    #[test]
    fn test_positive_page_sizes_pass_through() {
        let config = RunConfig::stateless(1, 250);
        assert_eq!(config.folder_id_page_size(), 1);
        assert_eq!(config.item_detail_page_size(), 250);
    }

    #[test]
    fn test_default_mode_is_sync_token() {
        assert_eq!(RunConfig::stateless(10, 10).mode(), SyncMode::SyncToken);
        assert_eq!(
            RunConfig::stateless(10, 10).with_mode(SyncMode::LastSynced).mode(),
            SyncMode::LastSynced
        );
    }

    #[test]
    fn test_derive_with_different_store_shares_other_fields() {
        let base = RunConfig::stateless(5, 3).with_mode(SyncMode::LastSynced);
        let store = Arc::new(InMemoryCheckpoints::new());
        let derived = base.with_folder_sync_token_store(store.clone());

        assert_eq!(derived.folder_id_page_size(), 5);
        assert_eq!(derived.item_detail_page_size(), 3);
        assert_eq!(derived.mode(), SyncMode::LastSynced);

        let folder = FolderId::id("F1");
        derived
            .folder_sync_token_store()
            .set_sync_token("alice", &folder, "t1")
            .unwrap();
        assert_eq!(store.sync_token("alice", &folder).unwrap().as_deref(), Some("t1"));

        // The original still discards writes
        base.folder_sync_token_store()
            .set_sync_token("alice", &folder, "t2")
            .unwrap();
        assert!(base.folder_sync_token_store().sync_token("alice", &folder).unwrap().is_none());
    }

    #[test]
    fn test_sync_mode_serde_names() {
        assert_eq!(serde_json::to_string(&SyncMode::SyncToken).unwrap(), r#""sync_token""#);
        let mode: SyncMode = serde_json::from_str(r#""last_synced""#).unwrap();
        assert_eq!(mode, SyncMode::LastSynced);
    }
}
