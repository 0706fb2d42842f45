//! Item id paging within one folder

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;

use super::chain::{LazyChain, Supplier};
use super::details::ItemDetailPager;
use super::run_config::{RunConfig, SyncMode};
use crate::models::{FolderHandle, MailRecord};
use crate::service::{ItemIdRequest, MailService, PageCursor};

/// Pages through one folder's item ids, one [`ItemDetailPager`] per page.
///
/// A page shorter than `folder_id_page_size` is the last one, counting every
/// entry the server returned rather than just the harvestable ids. A full page
/// cannot be told apart from "more pages exist", so it is always followed by
/// one more request; when the folder holds an exact multiple of the page
/// size, that confirming request comes back empty. The server's own
/// last-page hint is not trusted to skip it.
///
/// The folder's sync token is committed to the checkpoint store exactly once,
/// after the id stream is exhausted, using the last token the server returned.
/// A failure before that leaves the committed token untouched.
pub struct ItemIdPager<'a> {
    service: &'a dyn MailService,
    config: &'a RunConfig,
    handle: FolderHandle,
    changed_since: Option<DateTime<Utc>>,
    offset: usize,
    pages_fetched: usize,
    last_page_seen: bool,
    committed: bool,
}

impl<'a> ItemIdPager<'a> {
    pub fn new(handle: FolderHandle, config: &'a RunConfig, service: &'a dyn MailService) -> Self {
        Self {
            service,
            config,
            handle,
            changed_since: None,
            offset: 0,
            pages_fetched: 0,
            last_page_seen: false,
            committed: false,
        }
    }

    /// Only list items changed since this instant (offset paging)
    pub fn changed_since(mut self, changed_since: Option<DateTime<Utc>>) -> Self {
        self.changed_since = changed_since;
        self
    }

    pub fn handle(&self) -> &FolderHandle {
        &self.handle
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn request(&self) -> ItemIdRequest {
        let cursor = match self.config.mode() {
            SyncMode::SyncToken => PageCursor::SyncToken(self.handle.sync_token().map(str::to_string)),
            SyncMode::LastSynced => PageCursor::Offset {
                offset: self.offset,
                changed_since: self.changed_since,
            },
        };
        ItemIdRequest {
            mailbox: self.handle.mailbox().to_string(),
            folder: self.handle.folder_id().clone(),
            page_size: self.config.folder_id_page_size(),
            cursor,
        }
    }

    fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;

        if let Some(token) = self.handle.sync_token() {
            self.config
                .folder_sync_token_store()
                .set_sync_token(self.handle.mailbox(), self.handle.folder_id(), token)
                .with_context(|| {
                    format!(
                        "Failed to commit sync token for folder {} of {}",
                        self.handle.folder_id(),
                        self.handle.mailbox()
                    )
                })?;
            debug!(
                "Committed sync token for folder {} of {} after {} pages",
                self.handle.folder_id(),
                self.handle.mailbox(),
                self.pages_fetched
            );
        }
        Ok(())
    }
}

impl<'a> Supplier for ItemIdPager<'a> {
    type Item = MailRecord;
    type Error = anyhow::Error;
    type Inner = ItemDetailPager<'a>;

    fn next_inner(&mut self) -> Result<Option<ItemDetailPager<'a>>> {
        // A full page may hold only deletions; keep paging until ids turn up
        loop {
            if self.last_page_seen {
                self.commit()?;
                return Ok(None);
            }

            let request = self.request();
            let page = self.service.list_item_ids(&request).with_context(|| {
                format!(
                    "Failed to list item ids in folder {} of {}",
                    request.folder, request.mailbox
                )
            })?;
            self.pages_fetched += 1;

            let entries = page.entries();
            debug!(
                "Page {} of folder {} in {}: {} ids of {} entries (server last-page hint: {})",
                self.pages_fetched,
                request.folder,
                request.mailbox,
                page.item_ids.len(),
                entries,
                page.includes_last_item
            );

            self.handle.advance(page.sync_token);
            self.offset = page.next_offset.unwrap_or(self.offset + entries);
            if entries < request.page_size {
                self.last_page_seen = true;
            }

            if !page.item_ids.is_empty() {
                return Ok(Some(ItemDetailPager::new(
                    request.mailbox,
                    request.folder,
                    page.item_ids,
                    self.config,
                    self.service,
                )));
            }
        }
    }
}

impl<'a> IntoIterator for ItemIdPager<'a> {
    type Item = Result<MailRecord>;
    type IntoIter = LazyChain<Self>;

    fn into_iter(self) -> Self::IntoIter {
        LazyChain::new(self)
    }
}
