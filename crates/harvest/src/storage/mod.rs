//! Record sinks
//!
//! Where harvested records end up. The trait keeps the crawl engine
//! independent of the output format.

mod jsonl;
mod memory;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::InMemoryRecordSink;
pub use traits::RecordSink;
