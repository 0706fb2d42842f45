//! Item detail paging within one page of item ids

use anyhow::{Context, Result};
use log::debug;

use super::chain::{LazyChain, Supplier};
use super::run_config::RunConfig;
use crate::ews::normalize_item;
use crate::models::{FolderId, ItemId, MailRecord};
use crate::service::MailService;

/// Resolves a list of item ids to records, `item_detail_page_size` at a time.
///
/// Exhaustion follows the id cursor only. A batch that resolves fewer items
/// than requested (deleted in the meantime) just yields fewer records.
pub struct ItemDetailPager<'a> {
    service: &'a dyn MailService,
    config: &'a RunConfig,
    mailbox: String,
    folder: FolderId,
    ids: Vec<ItemId>,
    cursor: usize,
}

impl<'a> ItemDetailPager<'a> {
    pub fn new(
        mailbox: impl Into<String>,
        folder: FolderId,
        ids: Vec<ItemId>,
        config: &'a RunConfig,
        service: &'a dyn MailService,
    ) -> Self {
        Self {
            service,
            config,
            mailbox: mailbox.into(),
            folder,
            ids,
            cursor: 0,
        }
    }

    /// Ids not yet requested
    pub fn remaining(&self) -> usize {
        self.ids.len() - self.cursor
    }
}

impl Supplier for ItemDetailPager<'_> {
    type Item = MailRecord;
    type Error = anyhow::Error;
    type Inner = Vec<Result<MailRecord>>;

    fn next_inner(&mut self) -> Result<Option<Self::Inner>> {
        if self.cursor >= self.ids.len() {
            return Ok(None);
        }

        let end = self
            .cursor
            .saturating_add(self.config.item_detail_page_size())
            .min(self.ids.len());
        let batch = &self.ids[self.cursor..end];

        let items = self
            .service
            .get_item_details(&self.mailbox, batch)
            .with_context(|| {
                format!(
                    "Failed to fetch {} item details in folder {} of {}",
                    batch.len(),
                    self.folder,
                    self.mailbox
                )
            })?;
        debug!(
            "Fetched {}/{} item details in folder {} of {}",
            items.len(),
            batch.len(),
            self.folder,
            self.mailbox
        );
        self.cursor = end;

        Ok(Some(
            items
                .into_iter()
                .map(|item| Ok(normalize_item(item, &self.mailbox, &self.folder)))
                .collect(),
        ))
    }
}

impl<'a> IntoIterator for ItemDetailPager<'a> {
    type Item = Result<MailRecord>;
    type IntoIter = LazyChain<Self>;

    fn into_iter(self) -> Self::IntoIter {
        LazyChain::new(self)
    }
}
