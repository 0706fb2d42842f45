//! Harvested mail record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One harvested mail item as a header name to header value mapping.
///
/// Immutable once built. Fields the remote item did not carry are absent
/// keys, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailRecord {
    headers: BTreeMap<String, String>,
}

impl MailRecord {
    pub fn builder() -> MailRecordBuilder {
        MailRecordBuilder::default()
    }

    /// Get a header value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Builder for [`MailRecord`] that drops absent and empty values
#[derive(Debug, Default)]
pub struct MailRecordBuilder {
    headers: BTreeMap<String, String>,
}

impl MailRecordBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.headers.insert(name.into(), value);
        }
        self
    }

    pub fn header_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    pub fn build(self) -> MailRecord {
        MailRecord {
            headers: self.headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_values_are_dropped() {
        let record = MailRecord::builder()
            .header("Subject", "Hello")
            .header("Cc", "")
            .header_opt("To", None::<String>)
            .header_opt("From", Some("a@example.com"))
            .build();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Subject"), Some("Hello"));
        assert_eq!(record.get("From"), Some("a@example.com"));
        assert!(!record.contains("Cc"));
        assert!(!record.contains("To"));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let record = MailRecord::builder()
            .header("Subject", "Hi")
            .header("X-Item-Id", "AAA")
            .build();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Subject":"Hi","X-Item-Id":"AAA"}"#);
    }
}
