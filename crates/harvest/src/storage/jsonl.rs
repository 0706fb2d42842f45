//! JSON Lines record sink
//!
//! One JSON object per record, header name to value, newline terminated.

use anyhow::{Context, Result};
use std::io::Write;

use super::RecordSink;
use crate::models::MailRecord;

pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn store(&mut self, record: MailRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &record).context("Failed to serialize record")?;
        self.writer
            .write_all(b"\n")
            .context("Failed to write record separator")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush record output")
    }
}
