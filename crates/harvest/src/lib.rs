//! Harvest - lazy, checkpointed mail crawling
//!
//! This crate provides the platform-independent crawl engine:
//! - Domain models (MailRecord, FolderId, ItemId)
//! - The remote mail service contract and its EWS SOAP implementation
//! - Checkpoint stores (none, in-memory, SQLite)
//! - Record sinks
//! - A pull-based sync engine over mailboxes, folders, id pages and detail batches
//!
//! Remote calls only happen as records are pulled, and checkpoints only move
//! forward once a folder or mailbox has been fully drained.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod ews;
pub mod models;
pub mod service;
pub mod storage;
pub mod sync;

pub use checkpoint::{
    FolderSyncTokenStore, InMemoryCheckpoints, LastSyncStore, NoCheckpoints, SqliteCheckpointStore,
};
pub use config::HarvestSettings;
pub use error::ServiceError;
pub use ews::{EwsAuth, EwsClient};
pub use models::{FolderHandle, FolderId, ItemId, MailRecord, WellKnownFolder};
pub use service::{ItemIdPage, ItemIdRequest, MailService, Mailbox, PageCursor, RawItem};
pub use storage::{InMemoryRecordSink, JsonLinesSink, RecordSink};
pub use sync::{
    FolderDiscovery, HarvestStats, ItemDetailPager, ItemIdPager, LazyChain, MailboxCrawler,
    MailboxFailure, RunConfig, Supplier, SyncMode, harvest,
};
