//! SOAP request envelopes for the EWS operations the harvester uses

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::models::{FolderId, ItemId};

pub(crate) const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SERVER_VERSION: &str = "Exchange2010_SP2";

/// Properties requested for every item detail fetch
const ITEM_PROPERTIES: &[&str] = &[
    "item:Subject",
    "item:DateTimeSent",
    "item:DateTimeReceived",
    "item:Size",
    "item:Importance",
    "item:HasAttachments",
    "item:InReplyTo",
    "item:ConversationId",
    "message:From",
    "message:ToRecipients",
    "message:CcRecipients",
    "message:InternetMessageId",
    "message:IsRead",
    "message:References",
];

/// Who the request acts on behalf of
#[derive(Debug, Clone, Copy)]
pub(crate) enum Access<'a> {
    /// Act as the mailbox owner via the impersonation header
    Impersonate(&'a str),
    /// Use the caller's own (delegate) rights on the mailbox
    Delegate(&'a str),
}

impl Access<'_> {
    fn header(&self) -> String {
        match self {
            Access::Impersonate(mailbox) => format!(
                "<t:ExchangeImpersonation><t:ConnectingSID><t:PrimarySmtpAddress>{}</t:PrimarySmtpAddress></t:ConnectingSID></t:ExchangeImpersonation>",
                escape(*mailbox)
            ),
            Access::Delegate(_) => String::new(),
        }
    }

    /// Folder reference, naming the mailbox only when not impersonating
    fn folder(&self, folder: &FolderId) -> String {
        match (folder, self) {
            (FolderId::Id(id), _) => format!(r#"<t:FolderId Id="{}"/>"#, escape(id.as_str())),
            (FolderId::WellKnown(kind), Access::Impersonate(_)) => {
                format!(r#"<t:DistinguishedFolderId Id="{}"/>"#, kind.as_str())
            }
            (FolderId::WellKnown(kind), Access::Delegate(mailbox)) => format!(
                r#"<t:DistinguishedFolderId Id="{}"><t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox></t:DistinguishedFolderId>"#,
                kind.as_str(),
                escape(*mailbox)
            ),
        }
    }
}

fn envelope(access: Access<'_>, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{SOAP_NS}" xmlns:t="{TYPES_NS}" xmlns:m="{MESSAGES_NS}">
<soap:Header><t:RequestServerVersion Version="{SERVER_VERSION}"/>{header}</soap:Header>
<soap:Body>{body}</soap:Body>
</soap:Envelope>"#,
        header = access.header(),
    )
}

/// `FindFolder` with deep traversal under `parent`
pub(crate) fn find_folder(access: Access<'_>, parent: &FolderId) -> String {
    let body = format!(
        r#"<m:FindFolder Traversal="Deep"><m:FolderShape><t:BaseShape>IdOnly</t:BaseShape></m:FolderShape><m:ParentFolderIds>{}</m:ParentFolderIds></m:FindFolder>"#,
        access.folder(parent)
    );
    envelope(access, &body)
}

/// `SyncFolderItems` returning ids only, resuming from `sync_state`
pub(crate) fn sync_folder_items(
    access: Access<'_>,
    folder: &FolderId,
    sync_state: Option<&str>,
    max_changes: usize,
) -> String {
    let sync_state = sync_state
        .map(|s| format!("<m:SyncState>{}</m:SyncState>", escape(s)))
        .unwrap_or_default();
    let body = format!(
        r#"<m:SyncFolderItems><m:ItemShape><t:BaseShape>IdOnly</t:BaseShape></m:ItemShape><m:SyncFolderId>{}</m:SyncFolderId>{}<m:MaxChangesReturned>{}</m:MaxChangesReturned></m:SyncFolderItems>"#,
        access.folder(folder),
        sync_state,
        max_changes
    );
    envelope(access, &body)
}

/// `FindItem` with indexed paging, optionally restricted by modification time
pub(crate) fn find_item(
    access: Access<'_>,
    folder: &FolderId,
    offset: usize,
    page_size: usize,
    changed_since: Option<DateTime<Utc>>,
) -> String {
    let restriction = changed_since
        .map(|since| {
            format!(
                r#"<m:Restriction><t:IsGreaterThanOrEqualTo><t:FieldURI FieldURI="item:LastModifiedTime"/><t:FieldURIOrConstant><t:Constant Value="{}"/></t:FieldURIOrConstant></t:IsGreaterThanOrEqualTo></m:Restriction>"#,
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            )
        })
        .unwrap_or_default();
    let body = format!(
        r#"<m:FindItem Traversal="Shallow"><m:ItemShape><t:BaseShape>IdOnly</t:BaseShape></m:ItemShape><m:IndexedPageItemView MaxEntriesReturned="{}" Offset="{}" BasePoint="Beginning"/>{}<m:ParentFolderIds>{}</m:ParentFolderIds></m:FindItem>"#,
        page_size,
        offset,
        restriction,
        access.folder(folder)
    );
    envelope(access, &body)
}

/// `GetItem` for a batch of ids with the harvested property set
pub(crate) fn get_item(access: Access<'_>, ids: &[ItemId]) -> String {
    let properties: String = ITEM_PROPERTIES
        .iter()
        .map(|uri| format!(r#"<t:FieldURI FieldURI="{}"/>"#, uri))
        .collect();
    let item_ids: String = ids
        .iter()
        .map(|id| format!(r#"<t:ItemId Id="{}"/>"#, escape(id.as_str())))
        .collect();
    let body = format!(
        r#"<m:GetItem><m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties>{}</t:AdditionalProperties></m:ItemShape><m:ItemIds>{}</m:ItemIds></m:GetItem>"#,
        properties, item_ids
    );
    envelope(access, &body)
}
