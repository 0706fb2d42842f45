//! Domain models for harvested mail entities

mod folder;
mod item;
mod record;

pub use folder::{FolderHandle, FolderId, WellKnownFolder};
pub use item::ItemId;
pub use record::{MailRecord, MailRecordBuilder};
