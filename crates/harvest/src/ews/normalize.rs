//! Raw item normalization
//!
//! Converts parsed remote items into flat header records.

use chrono::SecondsFormat;

use crate::models::{FolderId, MailRecord};
use crate::service::{Mailbox, RawItem};

fn address_list(mailboxes: &[Mailbox]) -> Option<String> {
    let rendered: Vec<String> = mailboxes.iter().filter_map(Mailbox::display).collect();
    (!rendered.is_empty()).then(|| rendered.join(", "))
}

fn flag(value: Option<bool>) -> Option<&'static str> {
    value.map(|v| if v { "true" } else { "false" })
}

/// Normalize a remote item into a [`MailRecord`]
///
/// The record also names the mailbox and folder it was harvested from so
/// downstream storage can key it without extra context.
pub fn normalize_item(item: RawItem, mailbox: &str, folder: &FolderId) -> MailRecord {
    MailRecord::builder()
        .header("X-Mailbox", mailbox)
        .header("X-Folder-Id", folder.to_string())
        .header("X-Item-Id", item.item_id.0)
        .header_opt("X-Change-Key", item.change_key)
        .header_opt("Subject", item.subject)
        .header_opt("From", item.from.as_ref().and_then(Mailbox::display))
        .header_opt("To", address_list(&item.to))
        .header_opt("Cc", address_list(&item.cc))
        .header_opt("Date", item.sent_at.map(|dt| dt.to_rfc2822()))
        .header_opt(
            "X-Received-Date",
            item.received_at
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )
        .header_opt("Message-ID", item.internet_message_id)
        .header_opt("In-Reply-To", item.in_reply_to)
        .header_opt("References", item.references)
        .header_opt("Importance", item.importance)
        .header_opt("X-Is-Read", flag(item.is_read))
        .header_opt("X-Has-Attachments", flag(item.has_attachments))
        .header_opt("X-Size", item.size.map(|s| s.to_string()))
        .header_opt("X-Conversation-Id", item.conversation_id)
        .build()
}
