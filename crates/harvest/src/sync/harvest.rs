//! Drive a full crawl into a record sink

use anyhow::{Context, Result};
use log::debug;

use super::crawler::{MailboxCrawler, MailboxFailure};
use super::run_config::RunConfig;
use crate::service::MailService;
use crate::storage::RecordSink;

/// Statistics from a harvest run
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    /// Number of mailboxes requested
    pub mailboxes: usize,
    /// Number of records handed to the sink
    pub records_stored: usize,
    /// Mailboxes that ended early, with the rendered error
    pub failed_mailboxes: Vec<MailboxFailure>,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Crawl `mailboxes` and store every record in `sink`.
///
/// Mailbox failures are isolated and reported in the returned stats. A sink
/// failure aborts the run, since records could otherwise be silently lost.
pub fn harvest(
    service: &dyn MailService,
    config: &RunConfig,
    mailboxes: &[String],
    sink: &mut dyn RecordSink,
) -> Result<HarvestStats> {
    let start = std::time::Instant::now();
    let mut stats = HarvestStats {
        mailboxes: mailboxes.len(),
        ..Default::default()
    };

    let mut crawler = MailboxCrawler::new(config, service, mailboxes.iter().cloned());
    for record in crawler.by_ref() {
        sink.store(record)
            .with_context(|| format!("Failed to store record {}", stats.records_stored + 1))?;
        stats.records_stored += 1;
    }
    sink.flush().context("Failed to flush record sink")?;

    stats.failed_mailboxes = crawler.failures();
    stats.duration_ms = start.elapsed().as_millis() as u64;

    debug!(
        "Harvested {} records from {} mailboxes ({} failed) in {}ms",
        stats.records_stored,
        stats.mailboxes,
        stats.failed_mailboxes.len(),
        stats.duration_ms
    );
    Ok(stats)
}
