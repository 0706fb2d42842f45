//! Lazy crawl engine
//!
//! Records flow out of four nested levels, each a [`Supplier`] of the next:
//! mailboxes, folders, pages of item ids, and batches of item details. The
//! caller's pulls drive every remote call, and checkpoints are only committed
//! once a level has been fully drained.

mod chain;
mod crawler;
mod details;
mod discovery;
mod harvest;
mod item_ids;
mod run_config;

pub use chain::{FromFn, LazyChain, Supplier, from_fn};
pub use crawler::{MailboxCrawler, MailboxFailure};
pub use details::ItemDetailPager;
pub use discovery::FolderDiscovery;
pub use harvest::{HarvestStats, harvest};
pub use item_ids::ItemIdPager;
pub use run_config::{RunConfig, SyncMode};
