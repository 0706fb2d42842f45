//! Folder discovery within one mailbox

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::VecDeque;

use super::chain::{LazyChain, Supplier};
use super::item_ids::ItemIdPager;
use super::run_config::{RunConfig, SyncMode};
use crate::models::{FolderHandle, FolderId, MailRecord, WellKnownFolder};
use crate::service::MailService;

/// Lists a mailbox's folders once, then pages them one after another.
///
/// Construction performs the single folder listing call; its failure is
/// returned immediately. Once every folder is exhausted the mailbox's
/// last-synced instant is set to when discovery started, so anything that
/// changed during the run is picked up again next time.
pub struct FolderDiscovery<'a> {
    service: &'a dyn MailService,
    config: &'a RunConfig,
    mailbox: String,
    started_at: DateTime<Utc>,
    changed_since: Option<DateTime<Utc>>,
    queue: VecDeque<FolderId>,
}

impl<'a> FolderDiscovery<'a> {
    pub fn new(
        mailbox: impl Into<String>,
        config: &'a RunConfig,
        service: &'a dyn MailService,
    ) -> Result<Self> {
        let mailbox = mailbox.into();
        let started_at = Utc::now();

        let changed_since = match config.mode() {
            SyncMode::LastSynced => config
                .last_sync_store()
                .last_synced(&mailbox)
                .with_context(|| format!("Failed to read last-synced checkpoint of {}", mailbox))?,
            SyncMode::SyncToken => None,
        };

        let root = FolderId::WellKnown(WellKnownFolder::MsgFolderRoot);
        let folders = service
            .list_folders(&mailbox, &root)
            .with_context(|| format!("Failed to list folders of {}", mailbox))?;

        if folders.is_empty() {
            warn!("No folders discovered in {}", mailbox);
        } else {
            debug!("Discovered {} folders in {}", folders.len(), mailbox);
        }

        Ok(Self {
            service,
            config,
            mailbox,
            started_at,
            changed_since,
            queue: folders.into(),
        })
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Folders not yet started
    pub fn remaining_folders(&self) -> usize {
        self.queue.len()
    }

    fn open_folder(&self, folder: FolderId) -> Result<ItemIdPager<'a>> {
        let sync_token = match self.config.mode() {
            SyncMode::SyncToken => self
                .config
                .folder_sync_token_store()
                .sync_token(&self.mailbox, &folder)
                .with_context(|| {
                    format!("Failed to read sync token for folder {} of {}", folder, self.mailbox)
                })?,
            SyncMode::LastSynced => None,
        };

        let handle = FolderHandle::new(self.mailbox.clone())
            .with_folder(folder)
            .with_sync_token(sync_token);
        Ok(ItemIdPager::new(handle, self.config, self.service).changed_since(self.changed_since))
    }

    fn complete(&self) -> Result<()> {
        self.config
            .last_sync_store()
            .set_last_synced(&self.mailbox, self.started_at)
            .with_context(|| format!("Failed to commit last-synced checkpoint of {}", self.mailbox))?;
        debug!("Finished all folders of {}", self.mailbox);
        Ok(())
    }
}

impl<'a> Supplier for FolderDiscovery<'a> {
    type Item = MailRecord;
    type Error = anyhow::Error;
    type Inner = ItemIdPager<'a>;

    fn next_inner(&mut self) -> Result<Option<ItemIdPager<'a>>> {
        match self.queue.pop_front() {
            Some(folder) => self.open_folder(folder).map(Some),
            None => {
                self.complete()?;
                Ok(None)
            }
        }
    }
}

impl<'a> IntoIterator for FolderDiscovery<'a> {
    type Item = Result<MailRecord>;
    type IntoIter = LazyChain<Self>;

    fn into_iter(self) -> Self::IntoIter {
        LazyChain::new(self)
    }
}
