//! Remote mail service contract
//!
//! The engine only relies on these three operations. [`crate::ews::EwsClient`]
//! implements them over SOAP; tests implement them in memory.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{FolderId, ItemId};

/// Position to resume item-id listing from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Opaque sync token; `None` starts a full sync
    SyncToken(Option<String>),
    /// Zero-based offset, optionally limited to items changed since an instant
    Offset {
        offset: usize,
        changed_since: Option<DateTime<Utc>>,
    },
}

/// One page request of item ids in one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdRequest {
    pub mailbox: String,
    pub folder: FolderId,
    pub page_size: usize,
    pub cursor: PageCursor,
}

/// One page of item ids as returned by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemIdPage {
    pub item_ids: Vec<ItemId>,
    /// Offset of the next page (offset paging only)
    pub next_offset: Option<usize>,
    /// Token covering everything up to this page (token paging only)
    pub sync_token: Option<String>,
    /// Server's "this was the last page" hint
    pub includes_last_item: bool,
    /// Entries the server counted against the page size. Sync pages also
    /// count deletions and flag changes, which carry no id to harvest.
    pub entries_returned: usize,
}

impl ItemIdPage {
    /// Size of the page as the server counted it, never less than the ids kept
    pub fn entries(&self) -> usize {
        self.entries_returned.max(self.item_ids.len())
    }
}

/// An address as the server reports it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Mailbox {
    /// Render as "Name <email>", falling back to whichever part is present
    pub fn display(&self) -> Option<String> {
        match (self.name.as_deref(), self.email.as_deref()) {
            (Some(name), Some(email)) if !name.is_empty() && name != email => {
                Some(format!("{} <{}>", name, email))
            }
            (_, Some(email)) if !email.is_empty() => Some(email.to_string()),
            (Some(name), _) if !name.is_empty() => Some(name.to_string()),
            _ => None,
        }
    }
}

/// Full details of one remote item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub item_id: ItemId,
    pub change_key: Option<String>,
    pub subject: Option<String>,
    pub from: Option<Mailbox>,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub importance: Option<String>,
    pub is_read: Option<bool>,
    pub has_attachments: Option<bool>,
    pub internet_message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub conversation_id: Option<String>,
}

/// Remote mail service operations consumed by the engine
pub trait MailService {
    /// List the folders below `parent`. Not paged.
    fn list_folders(&self, mailbox: &str, parent: &FolderId) -> Result<Vec<FolderId>>;

    /// Fetch one page of item ids
    fn list_item_ids(&self, request: &ItemIdRequest) -> Result<ItemIdPage>;

    /// Resolve item ids to full items. Ids that no longer exist are absent.
    fn get_item_details(&self, mailbox: &str, ids: &[ItemId]) -> Result<Vec<RawItem>>;
}
