//! Minimal namespace-agnostic element tree over quick-xml events
//!
//! SOAP responses are small (one page), so building a tree is cheaper to
//! reason about than a streaming state machine per operation. Element and
//! attribute names are stored by local name; prefixes are dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ServiceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ServiceError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::protocol(format!("bad attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| ServiceError::protocol(format!("bad attribute value: {}", e)))?;
            attrs.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attrs,
            ..Self::default()
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content, None when empty
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::text)
    }

    /// First element with this name in document order, excluding self
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|c| {
            if c.name == name {
                Some(c)
            } else {
                c.descendant(name)
            }
        })
    }

    /// Every element with this name in document order, excluding self
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}

/// Parse a document into its root element
pub(crate) fn parse(xml: &str) -> Result<Element, ServiceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ServiceError::protocol(format!("malformed XML: {}", e)))?;
        match event {
            Event::Start(e) => stack.push(Element::from_start(&e)?),
            Event::Empty(e) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ServiceError::protocol("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ServiceError::protocol(format!("bad text: {}", e)))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ServiceError::protocol("truncated XML document"));
    }
    root.ok_or_else(|| ServiceError::protocol("empty response"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_dropped() {
        let doc = parse(
            r#"<s:Envelope xmlns:s="urn:s"><s:Body><m:Thing t:Id="1" Kind="a">hi &amp; bye</m:Thing></s:Body></s:Envelope>"#,
        )
        .unwrap();

        assert_eq!(doc.name, "Envelope");
        let thing = doc.descendant("Thing").unwrap();
        assert_eq!(thing.attr("Id"), Some("1"));
        assert_eq!(thing.attr("Kind"), Some("a"));
        assert_eq!(thing.text(), Some("hi & bye"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = parse("<a><b n=\"1\"/><c><b n=\"2\"/></c><b n=\"3\"/></a>").unwrap();
        let ns: Vec<_> = doc
            .descendants_named("b")
            .iter()
            .filter_map(|b| b.attr("n"))
            .collect();
        assert_eq!(ns, vec!["1", "2", "3"]);
        assert_eq!(doc.children_named("b").count(), 2);
    }

    #[test]
    fn test_empty_and_truncated_documents() {
        assert_eq!(parse("").unwrap_err(), ServiceError::protocol("empty response"));
        assert!(matches!(parse("<a><b>"), Err(ServiceError::Protocol(_))));
        assert!(matches!(parse("<a></b>"), Err(ServiceError::Protocol(_))));
    }
}
