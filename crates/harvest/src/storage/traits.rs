//! Record sink trait definition

use crate::models::MailRecord;
use anyhow::Result;

/// Destination for harvested records, in crawl order
pub trait RecordSink {
    /// Store one record
    fn store(&mut self, record: MailRecord) -> Result<()>;

    /// Make everything stored so far durable
    fn flush(&mut self) -> Result<()>;
}
