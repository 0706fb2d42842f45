//! Top-level crawl over many mailboxes

use log::error;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::iter::FusedIterator;
use std::rc::Rc;

use super::chain::{LazyChain, Supplier};
use super::discovery::FolderDiscovery;
use super::run_config::RunConfig;
use crate::models::MailRecord;
use crate::service::MailService;

/// A mailbox whose crawl ended early because of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxFailure {
    pub mailbox: String,
    /// Full error chain, rendered
    pub error: String,
}

type FailureLog = Rc<RefCell<Vec<MailboxFailure>>>;

/// One mailbox's record stream with its failures contained.
///
/// Any error from discovery, id paging or detail paging is logged, recorded
/// and turned into the end of this mailbox's stream.
struct IsolatedMailbox<'a> {
    mailbox: String,
    records: Option<LazyChain<FolderDiscovery<'a>>>,
    failures: FailureLog,
}

impl<'a> IsolatedMailbox<'a> {
    fn open(
        mailbox: String,
        config: &'a RunConfig,
        service: &'a dyn MailService,
        failures: FailureLog,
    ) -> Self {
        let mut isolated = Self {
            mailbox,
            records: None,
            failures,
        };
        match FolderDiscovery::new(isolated.mailbox.clone(), config, service) {
            Ok(discovery) => isolated.records = Some(discovery.into_iter()),
            Err(e) => isolated.fail(e),
        }
        isolated
    }

    fn fail(&mut self, err: anyhow::Error) {
        error!("Skipping rest of mailbox {}: {:#}", self.mailbox, err);
        self.failures.borrow_mut().push(MailboxFailure {
            mailbox: self.mailbox.clone(),
            error: format!("{:#}", err),
        });
        self.records = None;
    }
}

impl Iterator for IsolatedMailbox<'_> {
    type Item = Result<MailRecord, Infallible>;

    fn next(&mut self) -> Option<Self::Item> {
        let records = self.records.as_mut()?;
        match records.next() {
            Some(Ok(record)) => Some(Ok(record)),
            Some(Err(e)) => {
                self.fail(e);
                None
            }
            None => {
                self.records = None;
                None
            }
        }
    }
}

struct MailboxQueue<'a> {
    service: &'a dyn MailService,
    config: &'a RunConfig,
    mailboxes: VecDeque<String>,
    failures: FailureLog,
}

impl<'a> Supplier for MailboxQueue<'a> {
    type Item = MailRecord;
    type Error = Infallible;
    type Inner = IsolatedMailbox<'a>;

    fn next_inner(&mut self) -> Result<Option<IsolatedMailbox<'a>>, Infallible> {
        Ok(self.mailboxes.pop_front().map(|mailbox| {
            IsolatedMailbox::open(mailbox, self.config, self.service, self.failures.clone())
        }))
    }
}

/// Flat, pull-based stream of records across mailboxes.
///
/// Mailboxes are crawled in the given order (duplicates included), one at a
/// time. A failing mailbox ends early without affecting the others; see
/// [`MailboxCrawler::failures`].
pub struct MailboxCrawler<'a> {
    chain: LazyChain<MailboxQueue<'a>>,
    failures: FailureLog,
}

impl<'a> MailboxCrawler<'a> {
    pub fn new<I>(config: &'a RunConfig, service: &'a dyn MailService, mailboxes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let failures = FailureLog::default();
        let queue = MailboxQueue {
            service,
            config,
            mailboxes: mailboxes.into_iter().map(Into::into).collect(),
            failures: failures.clone(),
        };
        Self {
            chain: LazyChain::new(queue),
            failures,
        }
    }

    /// Mailboxes not yet started
    pub fn remaining_mailboxes(&self) -> usize {
        self.chain.supplier().mailboxes.len()
    }

    /// Mailboxes that failed so far, in failure order
    pub fn failures(&self) -> Vec<MailboxFailure> {
        self.failures.borrow().clone()
    }
}

impl Iterator for MailboxCrawler<'_> {
    type Item = MailRecord;

    fn next(&mut self) -> Option<MailRecord> {
        self.chain.next().map(|item| match item {
            Ok(record) => record,
            Err(never) => match never {},
        })
    }
}

impl FusedIterator for MailboxCrawler<'_> {}
