//! EWS SOAP client
//!
//! Implements [`MailService`] over Exchange Web Services.
//! Uses synchronous HTTP (ureq) to match the pull-based engine.

use anyhow::{Context, Result};
use base64::prelude::*;
use log::debug;
use std::time::Duration;

use super::envelope::{self, Access, MESSAGES_NS};
use super::{response, xml};
use crate::error::ServiceError;
use crate::models::{FolderId, ItemId};
use crate::service::{ItemIdPage, ItemIdRequest, MailService, PageCursor, RawItem};

/// Longest response excerpt kept in a transport error
const ERROR_EXCERPT_LEN: usize = 512;

/// Credentials presented on every request
#[derive(Clone)]
pub enum EwsAuth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl EwsAuth {
    fn header_value(&self) -> String {
        match self {
            Self::Basic { username, password } => format!(
                "Basic {}",
                BASE64_STANDARD.encode(format!("{}:{}", username, password))
            ),
            Self::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

impl std::fmt::Debug for EwsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({})", username),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

/// EWS client for one endpoint and one set of credentials
pub struct EwsClient {
    agent: ureq::Agent,
    endpoint: String,
    auth: EwsAuth,
    impersonate: bool,
}

impl EwsClient {
    /// Create a client for `endpoint` (e.g. `https://mail.example.com/EWS/Exchange.asmx`)
    ///
    /// Impersonation is on by default; each request then acts as the target
    /// mailbox's owner.
    pub fn new(endpoint: &str, auth: EwsAuth, timeout: Duration) -> Result<Self> {
        let url = url::Url::parse(endpoint)
            .with_context(|| format!("Invalid EWS endpoint: {}", endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("EWS endpoint must be http(s): {}", endpoint);
        }

        // Status codes are inspected by hand so SOAP fault bodies stay readable
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: url.to_string(),
            auth,
            impersonate: true,
        })
    }

    pub fn with_impersonation(mut self, impersonate: bool) -> Self {
        self.impersonate = impersonate;
        self
    }

    fn access<'a>(&self, mailbox: &'a str) -> Access<'a> {
        if self.impersonate {
            Access::Impersonate(mailbox)
        } else {
            Access::Delegate(mailbox)
        }
    }

    /// POST one SOAP request and return the raw response body
    fn call(&self, mailbox: &str, action: &str, body: &str) -> Result<String, ServiceError> {
        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", &format!("\"{}/{}\"", MESSAGES_NS, action))
            .header("Authorization", &self.auth.header_value());
        if self.impersonate {
            request = request.header("X-AnchorMailbox", mailbox);
        }

        let mut response = request.send(body).map_err(|e| ServiceError::Transport {
            status: None,
            message: format!("{} request failed: {}", action, e),
        })?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ServiceError::Transport {
                status: Some(status),
                message: format!("failed to read {} response: {}", action, e),
            })?;
        debug!("{} for {} -> HTTP {} ({} bytes)", action, mailbox, status, text.len());

        match status {
            200..=299 => Ok(text),
            401 | 403 => Err(ServiceError::Authentication(format!(
                "{} rejected with HTTP {}",
                action, status
            ))),
            _ => {
                // Exchange reports most request errors as a SOAP fault with HTTP 500
                if let Ok(doc) = xml::parse(&text)
                    && let Some(fault) = response::fault(&doc)
                {
                    return Err(fault);
                }
                Err(ServiceError::Transport {
                    status: Some(status),
                    message: excerpt(&text),
                })
            }
        }
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(ERROR_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl MailService for EwsClient {
    fn list_folders(&self, mailbox: &str, parent: &FolderId) -> Result<Vec<FolderId>> {
        let request = envelope::find_folder(self.access(mailbox), parent);
        let body = self.call(mailbox, "FindFolder", &request)?;
        Ok(response::find_folder(&body)?)
    }

    fn list_item_ids(&self, request: &ItemIdRequest) -> Result<ItemIdPage> {
        let access = self.access(&request.mailbox);
        let page = match &request.cursor {
            PageCursor::SyncToken(token) => {
                let soap = envelope::sync_folder_items(
                    access,
                    &request.folder,
                    token.as_deref(),
                    request.page_size,
                );
                let body = self.call(&request.mailbox, "SyncFolderItems", &soap)?;
                response::sync_folder_items(&body)?
            }
            PageCursor::Offset {
                offset,
                changed_since,
            } => {
                let soap = envelope::find_item(
                    access,
                    &request.folder,
                    *offset,
                    request.page_size,
                    *changed_since,
                );
                let body = self.call(&request.mailbox, "FindItem", &soap)?;
                response::find_item(&body)?
            }
        };
        Ok(page)
    }

    fn get_item_details(&self, mailbox: &str, ids: &[ItemId]) -> Result<Vec<RawItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = envelope::get_item(self.access(mailbox), ids);
        let body = self.call(mailbox, "GetItem", &request)?;
        Ok(response::get_item(&body)?)
    }
}
