//! EWS response parsing
//!
//! Each parser checks for a SOAP fault first, then for an error
//! `ResponseClass` on the operation's response message, then extracts the
//! payload. Structural gaps are protocol failures.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::xml::{self, Element};
use crate::error::ServiceError;
use crate::models::{FolderId, ItemId};
use crate::service::{ItemIdPage, Mailbox, RawItem};

/// Per-item response code for ids that no longer resolve
const ITEM_NOT_FOUND: &str = "ErrorItemNotFound";

/// Map a SOAP fault to a typed error, if the document carries one
pub(crate) fn fault(doc: &Element) -> Option<ServiceError> {
    let fault = doc.descendant("Fault")?;
    let message = fault
        .child_text("faultstring")
        .unwrap_or("SOAP fault without faultstring")
        .to_string();
    let code = fault
        .descendant("ResponseCode")
        .and_then(Element::text)
        .or_else(|| fault.child_text("faultcode"))
        .unwrap_or("SoapFault");
    Some(ServiceError::from_response_code(code, message))
}

fn parse_checked(body: &str) -> Result<Element, ServiceError> {
    let doc = xml::parse(body)?;
    match fault(&doc) {
        Some(err) => Err(err),
        None => Ok(doc),
    }
}

/// Error carried by a `*ResponseMessage` element, if its class is Error
fn message_error(message: &Element) -> Option<ServiceError> {
    if message.attr("ResponseClass") != Some("Error") {
        return None;
    }
    let code = message.child_text("ResponseCode").unwrap_or("ErrorUnknown");
    let text = message.child_text("MessageText").unwrap_or_default();
    Some(ServiceError::from_response_code(code, text))
}

/// The single response message of a one-target operation, checked for errors
fn single_message<'a>(doc: &'a Element, name: &str) -> Result<&'a Element, ServiceError> {
    let message = doc
        .descendant(name)
        .ok_or_else(|| ServiceError::protocol(format!("response lacks {}", name)))?;
    match message_error(message) {
        Some(err) => Err(err),
        None => Ok(message),
    }
}

fn parse_bool(text: Option<&str>) -> Option<bool> {
    match text? {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_instant(text: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text?;
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!("Ignoring unparsable timestamp {:?}: {}", text, e);
            None
        }
    }
}

/// `FindFolderResponse` → mail folder ids in response order
pub(crate) fn find_folder(body: &str) -> Result<Vec<FolderId>, ServiceError> {
    let doc = parse_checked(body)?;
    let message = single_message(&doc, "FindFolderResponseMessage")?;
    let folders = message
        .descendant("Folders")
        .ok_or_else(|| ServiceError::protocol("FindFolder response lacks Folders"))?;

    // Calendar, contact, task and search folders use other element names
    folders
        .children_named("Folder")
        .map(|folder| {
            folder
                .child("FolderId")
                .and_then(|id| id.attr("Id"))
                .map(FolderId::id)
                .ok_or_else(|| ServiceError::protocol("Folder without FolderId"))
        })
        .collect()
}

/// `SyncFolderItemsResponse` → created and updated item ids plus new sync state
pub(crate) fn sync_folder_items(body: &str) -> Result<ItemIdPage, ServiceError> {
    let doc = parse_checked(body)?;
    let message = single_message(&doc, "SyncFolderItemsResponseMessage")?;

    let sync_token = message
        .child_text("SyncState")
        .ok_or_else(|| ServiceError::protocol("SyncFolderItems response lacks SyncState"))?
        .to_string();
    let includes_last_item = parse_bool(message.child_text("IncludesLastItemInRange")).unwrap_or(false);

    let changes = message.child("Changes").map(|c| c.children()).unwrap_or_default();

    // Deletes and read-flag changes fill the page but have nothing to harvest
    let item_ids = changes
        .iter()
        .filter(|change| change.name == "Create" || change.name == "Update")
        .filter_map(|change| change.descendant("ItemId"))
        .map(|id| {
            id.attr("Id")
                .map(ItemId::new)
                .ok_or_else(|| ServiceError::protocol("ItemId without Id"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ItemIdPage {
        item_ids,
        next_offset: None,
        sync_token: Some(sync_token),
        includes_last_item,
        entries_returned: changes.len(),
    })
}

/// `FindItemResponse` → item ids plus next offset
pub(crate) fn find_item(body: &str) -> Result<ItemIdPage, ServiceError> {
    let doc = parse_checked(body)?;
    let message = single_message(&doc, "FindItemResponseMessage")?;
    let root = message
        .child("RootFolder")
        .ok_or_else(|| ServiceError::protocol("FindItem response lacks RootFolder"))?;

    let next_offset = root
        .attr("IndexedPagingOffset")
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| ServiceError::protocol(format!("bad IndexedPagingOffset {:?}", raw)))
        })
        .transpose()?;
    let includes_last_item = parse_bool(root.attr("IncludesLastItemInRange")).unwrap_or(false);

    let item_ids = match root.child("Items") {
        Some(items) => items
            .children()
            .iter()
            .map(|item| {
                item.child("ItemId")
                    .and_then(|id| id.attr("Id"))
                    .map(ItemId::new)
                    .ok_or_else(|| ServiceError::protocol("item without ItemId"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(ItemIdPage {
        entries_returned: item_ids.len(),
        item_ids,
        next_offset,
        sync_token: None,
        includes_last_item,
    })
}

/// `GetItemResponse` → one raw item per resolvable id, in request order
pub(crate) fn get_item(body: &str) -> Result<Vec<RawItem>, ServiceError> {
    let doc = parse_checked(body)?;
    let messages = doc.descendants_named("GetItemResponseMessage");
    if messages.is_empty() && doc.descendant("ResponseMessages").is_none() {
        return Err(ServiceError::protocol("response lacks GetItemResponseMessage"));
    }

    let mut items = Vec::with_capacity(messages.len());
    for message in messages {
        if let Some(err) = message_error(message) {
            if message.child_text("ResponseCode") == Some(ITEM_NOT_FOUND) {
                debug!("Skipping unresolvable item: {}", err);
                continue;
            }
            return Err(err);
        }
        let item = message
            .child("Items")
            .and_then(|items| items.children().first())
            .ok_or_else(|| ServiceError::protocol("GetItem response message without item"))?;
        items.push(raw_item(item)?);
    }
    Ok(items)
}

fn mailbox(element: &Element) -> Mailbox {
    Mailbox {
        name: element.child_text("Name").map(str::to_string),
        email: element.child_text("EmailAddress").map(str::to_string),
    }
}

fn recipients(item: &Element, name: &str) -> Vec<Mailbox> {
    item.child(name)
        .map(|list| list.children_named("Mailbox").map(mailbox).collect())
        .unwrap_or_default()
}

fn raw_item(item: &Element) -> Result<RawItem, ServiceError> {
    let id = item
        .child("ItemId")
        .ok_or_else(|| ServiceError::protocol("item without ItemId"))?;
    let item_id = id
        .attr("Id")
        .map(ItemId::new)
        .ok_or_else(|| ServiceError::protocol("ItemId without Id"))?;
    let text = |name: &str| item.child_text(name).map(str::to_string);

    Ok(RawItem {
        item_id,
        change_key: id.attr("ChangeKey").map(str::to_string),
        subject: text("Subject"),
        from: item
            .child("From")
            .and_then(|from| from.child("Mailbox"))
            .map(mailbox),
        to: recipients(item, "ToRecipients"),
        cc: recipients(item, "CcRecipients"),
        sent_at: parse_instant(item.child_text("DateTimeSent")),
        received_at: parse_instant(item.child_text("DateTimeReceived")),
        size: item.child_text("Size").and_then(|s| s.parse().ok()),
        importance: text("Importance"),
        is_read: parse_bool(item.child_text("IsRead")),
        has_attachments: parse_bool(item.child_text("HasAttachments")),
        internet_message_id: text("InternetMessageId"),
        in_reply_to: text("InReplyTo"),
        references: text("References"),
        conversation_id: item
            .child("ConversationId")
            .and_then(|c| c.attr("Id"))
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
    xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
  <s:Body>{}</s:Body>
</s:Envelope>"#,
            body
        )
    }

    #[test]
    fn test_find_folder_keeps_mail_folders_only() {
        let body = wrap(
            r#"<m:FindFolderResponse><m:ResponseMessages>
              <m:FindFolderResponseMessage ResponseClass="Success">
                <m:ResponseCode>NoError</m:ResponseCode>
                <m:RootFolder TotalItemsInView="3" IncludesLastItemInRange="true">
                  <t:Folders>
                    <t:Folder><t:FolderId Id="F1" ChangeKey="a"/></t:Folder>
                    <t:CalendarFolder><t:FolderId Id="CAL" ChangeKey="b"/></t:CalendarFolder>
                    <t:Folder><t:FolderId Id="F2" ChangeKey="c"/></t:Folder>
                  </t:Folders>
                </m:RootFolder>
              </m:FindFolderResponseMessage>
            </m:ResponseMessages></m:FindFolderResponse>"#,
        );

        let folders = find_folder(&body).unwrap();
        assert_eq!(folders, vec![FolderId::id("F1"), FolderId::id("F2")]);
    }

    #[test]
    fn test_find_folder_error_class() {
        let body = wrap(
            r#"<m:FindFolderResponse><m:ResponseMessages>
              <m:FindFolderResponseMessage ResponseClass="Error">
                <m:MessageText>The specified object was not found in the store.</m:MessageText>
                <m:ResponseCode>ErrorNonExistentMailbox</m:ResponseCode>
              </m:FindFolderResponseMessage>
            </m:ResponseMessages></m:FindFolderResponse>"#,
        );

        let err = find_folder(&body).unwrap_err();
        assert_eq!(err.response_code(), Some("ErrorNonExistentMailbox"));
    }

    #[test]
    fn test_soap_fault_with_impersonation_code() {
        let body = wrap(
            r#"<s:Fault>
              <faultcode>s:Client</faultcode>
              <faultstring>The account does not have permission to impersonate the requested user.</faultstring>
              <detail><e:ResponseCode xmlns:e="urn:e">ErrorImpersonateUserDenied</e:ResponseCode></detail>
            </s:Fault>"#,
        );

        let err = find_folder(&body).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_sync_folder_items_page() {
        let body = wrap(
            r#"<m:SyncFolderItemsResponse><m:ResponseMessages>
              <m:SyncFolderItemsResponseMessage ResponseClass="Success">
                <m:ResponseCode>NoError</m:ResponseCode>
                <m:SyncState>H4sIAAAA</m:SyncState>
                <m:IncludesLastItemInRange>false</m:IncludesLastItemInRange>
                <m:Changes>
                  <t:Create><t:Message><t:ItemId Id="I1" ChangeKey="x"/></t:Message></t:Create>
                  <t:Delete><t:ItemId Id="GONE" ChangeKey="y"/></t:Delete>
                  <t:Update><t:Message><t:ItemId Id="I2" ChangeKey="z"/></t:Message></t:Update>
                  <t:ReadFlagChange><t:ItemId Id="FLAG"/><t:IsRead>true</t:IsRead></t:ReadFlagChange>
                </m:Changes>
              </m:SyncFolderItemsResponseMessage>
            </m:ResponseMessages></m:SyncFolderItemsResponse>"#,
        );

        let page = sync_folder_items(&body).unwrap();
        assert_eq!(page.item_ids, vec![ItemId::new("I1"), ItemId::new("I2")]);
        assert_eq!(page.sync_token.as_deref(), Some("H4sIAAAA"));
        assert!(!page.includes_last_item);
        assert!(page.next_offset.is_none());
        assert_eq!(page.entries_returned, 4);
        assert_eq!(page.entries(), 4);
    }

    #[test]
    fn test_sync_folder_items_requires_sync_state() {
        let body = wrap(
            r#"<m:SyncFolderItemsResponse><m:ResponseMessages>
              <m:SyncFolderItemsResponseMessage ResponseClass="Success">
                <m:Changes/>
              </m:SyncFolderItemsResponseMessage>
            </m:ResponseMessages></m:SyncFolderItemsResponse>"#,
        );

        assert!(matches!(sync_folder_items(&body), Err(ServiceError::Protocol(_))));
    }

    #[test]
    fn test_find_item_page() {
        let body = wrap(
            r#"<m:FindItemResponse><m:ResponseMessages>
              <m:FindItemResponseMessage ResponseClass="Success">
                <m:ResponseCode>NoError</m:ResponseCode>
                <m:RootFolder IndexedPagingOffset="7" TotalItemsInView="7" IncludesLastItemInRange="true">
                  <t:Items>
                    <t:Message><t:ItemId Id="I6"/></t:Message>
                    <t:MeetingRequest><t:ItemId Id="I7"/></t:MeetingRequest>
                  </t:Items>
                </m:RootFolder>
              </m:FindItemResponseMessage>
            </m:ResponseMessages></m:FindItemResponse>"#,
        );

        let page = find_item(&body).unwrap();
        assert_eq!(page.item_ids, vec![ItemId::new("I6"), ItemId::new("I7")]);
        assert_eq!(page.next_offset, Some(7));
        assert!(page.includes_last_item);
    }

    #[test]
    fn test_get_item_skips_missing_ids() {
        let body = wrap(
            r#"<m:GetItemResponse><m:ResponseMessages>
              <m:GetItemResponseMessage ResponseClass="Success">
                <m:ResponseCode>NoError</m:ResponseCode>
                <m:Items>
                  <t:Message>
                    <t:ItemId Id="I1" ChangeKey="CK1"/>
                    <t:Subject>Quarterly &amp; numbers</t:Subject>
                    <t:DateTimeSent>2024-03-01T09:00:00Z</t:DateTimeSent>
                    <t:DateTimeReceived>2024-03-01T09:00:05Z</t:DateTimeReceived>
                    <t:Size>2048</t:Size>
                    <t:Importance>Normal</t:Importance>
                    <t:HasAttachments>false</t:HasAttachments>
                    <t:ConversationId Id="CONV1"/>
                    <t:ToRecipients>
                      <t:Mailbox><t:Name>Bob</t:Name><t:EmailAddress>bob@example.com</t:EmailAddress></t:Mailbox>
                      <t:Mailbox><t:EmailAddress>carol@example.com</t:EmailAddress></t:Mailbox>
                    </t:ToRecipients>
                    <t:IsRead>true</t:IsRead>
                    <t:From><t:Mailbox><t:Name>Alice</t:Name><t:EmailAddress>alice@example.com</t:EmailAddress></t:Mailbox></t:From>
                    <t:InternetMessageId>&lt;m1@example.com&gt;</t:InternetMessageId>
                  </t:Message>
                </m:Items>
              </m:GetItemResponseMessage>
              <m:GetItemResponseMessage ResponseClass="Error">
                <m:MessageText>The specified object was not found in the store.</m:MessageText>
                <m:ResponseCode>ErrorItemNotFound</m:ResponseCode>
                <m:Items/>
              </m:GetItemResponseMessage>
            </m:ResponseMessages></m:GetItemResponse>"#,
        );

        let items = get_item(&body).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.item_id, ItemId::new("I1"));
        assert_eq!(item.change_key.as_deref(), Some("CK1"));
        assert_eq!(item.subject.as_deref(), Some("Quarterly & numbers"));
        assert_eq!(item.size, Some(2048));
        assert_eq!(item.is_read, Some(true));
        assert_eq!(item.has_attachments, Some(false));
        assert_eq!(item.to.len(), 2);
        assert_eq!(item.from.as_ref().unwrap().name.as_deref(), Some("Alice"));
        assert_eq!(item.internet_message_id.as_deref(), Some("<m1@example.com>"));
        assert_eq!(item.conversation_id.as_deref(), Some("CONV1"));
        assert!(item.cc.is_empty());
        assert!(item.in_reply_to.is_none());
        assert_eq!(
            item.sent_at,
            Some(DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc))
        );
    }

    #[test]
    fn test_get_item_other_errors_fail_the_batch() {
        let body = wrap(
            r#"<m:GetItemResponse><m:ResponseMessages>
              <m:GetItemResponseMessage ResponseClass="Error">
                <m:MessageText>Access is denied.</m:MessageText>
                <m:ResponseCode>ErrorAccessDenied</m:ResponseCode>
              </m:GetItemResponseMessage>
            </m:ResponseMessages></m:GetItemResponse>"#,
        );

        let err = get_item(&body).unwrap_err();
        assert_eq!(err.response_code(), Some("ErrorAccessDenied"));
    }

    #[test]
    fn test_unrelated_document_is_protocol_failure() {
        assert!(matches!(get_item("<html><body/></html>"), Err(ServiceError::Protocol(_))));
        assert!(matches!(find_item(""), Err(ServiceError::Protocol(_))));
    }
}
