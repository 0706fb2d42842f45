//! In-memory record sink, used by tests and embedding callers

use anyhow::Result;

use super::RecordSink;
use crate::models::MailRecord;

#[derive(Debug, Default)]
pub struct InMemoryRecordSink {
    records: Vec<MailRecord>,
    flushes: usize,
}

impl InMemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MailRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MailRecord> {
        self.records
    }

    /// Number of times `flush` was called
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl RecordSink for InMemoryRecordSink {
    fn store(&mut self, record: MailRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_records_in_order() {
        let mut sink = InMemoryRecordSink::new();
        for id in ["a", "b", "c"] {
            sink.store(MailRecord::builder().header("X-Item-Id", id).build())
                .unwrap();
        }
        sink.flush().unwrap();

        let ids: Vec<_> = sink
            .records()
            .iter()
            .map(|r| r.get("X-Item-Id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(sink.flushes(), 1);
        assert_eq!(sink.into_records().len(), 3);
    }
}
