//! Folder identity and per-run folder state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distinguished folders every mailbox exposes under a fixed name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellKnownFolder {
    Root,
    MsgFolderRoot,
    Inbox,
    SentItems,
    Drafts,
    DeletedItems,
    JunkEmail,
    Outbox,
    ArchiveInbox,
}

impl WellKnownFolder {
    /// Name used on the wire (`DistinguishedFolderId Id="..."`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::MsgFolderRoot => "msgfolderroot",
            Self::Inbox => "inbox",
            Self::SentItems => "sentitems",
            Self::Drafts => "drafts",
            Self::DeletedItems => "deleteditems",
            Self::JunkEmail => "junkemail",
            Self::Outbox => "outbox",
            Self::ArchiveInbox => "archiveinbox",
        }
    }
}

/// Identifies a folder either by well-known kind or by opaque server id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderId {
    WellKnown(WellKnownFolder),
    Id(String),
}

impl FolderId {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Stable key for checkpoint stores.
    ///
    /// Prefixed so a well-known name can never collide with an opaque id.
    pub fn storage_key(&self) -> String {
        match self {
            Self::WellKnown(kind) => format!("wellknown:{}", kind.as_str()),
            Self::Id(id) => format!("id:{}", id),
        }
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::WellKnown(WellKnownFolder::Inbox)
    }
}

impl From<WellKnownFolder> for FolderId {
    fn from(kind: WellKnownFolder) -> Self {
        Self::WellKnown(kind)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WellKnown(kind) => f.write_str(kind.as_str()),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// One target folder of one mailbox, plus its in-memory sync token.
///
/// The token starts at whatever the checkpoint store last persisted and is
/// overwritten after every successful id-page fetch. The pager sends this
/// in-memory value on the next request; the store only sees the final one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    folder_id: FolderId,
    mailbox: String,
    sync_token: Option<String>,
}

impl FolderHandle {
    /// Handle for the mailbox's inbox with no sync token (full sync)
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            folder_id: FolderId::default(),
            mailbox: mailbox.into(),
            sync_token: None,
        }
    }

    pub fn with_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Seed the in-memory token. Empty tokens mean "full sync".
    pub fn with_sync_token(mut self, sync_token: Option<String>) -> Self {
        self.sync_token = sync_token.filter(|t| !t.is_empty());
        self
    }

    pub fn folder_id(&self) -> &FolderId {
        &self.folder_id
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    /// Overwrite the in-memory token with the one the server just returned.
    ///
    /// A page without a token keeps the previous one.
    pub fn advance(&mut self, sync_token: Option<String>) {
        if let Some(token) = sync_token.filter(|t| !t.is_empty()) {
            self.sync_token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_folder_is_inbox() {
        let handle = FolderHandle::new("alice@example.com");
        assert_eq!(handle.folder_id(), &FolderId::WellKnown(WellKnownFolder::Inbox));
        assert_eq!(handle.mailbox(), "alice@example.com");
        assert!(handle.sync_token().is_none());
    }

    #[test]
    fn test_empty_token_means_full_sync() {
        let handle = FolderHandle::new("alice").with_sync_token(Some(String::new()));
        assert!(handle.sync_token().is_none());
    }

    #[test]
    fn test_advance_overwrites_token() {
        let mut handle = FolderHandle::new("alice")
            .with_folder(FolderId::id("F1"))
            .with_sync_token(Some("t0".to_string()));

        handle.advance(Some("t1".to_string()));
        assert_eq!(handle.sync_token(), Some("t1"));

        // Pages without a token leave the cursor where it was
        handle.advance(None);
        assert_eq!(handle.sync_token(), Some("t1"));
    }

    #[test]
    fn test_storage_keys_do_not_collide() {
        let well_known = FolderId::WellKnown(WellKnownFolder::Inbox);
        let opaque = FolderId::id("inbox");
        assert_ne!(well_known.storage_key(), opaque.storage_key());
        assert_eq!(well_known.storage_key(), "wellknown:inbox");
        assert_eq!(opaque.storage_key(), "id:inbox");
    }
}
