//! Small XML helpers shared by the SOAP and XML-RPC codecs.
//!
//! Writing goes through `quick-xml`, which escapes text for us. Reading goes
//! through `roxmltree`, which rejects DTDs and hands back a navigable tree.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::Node;

use crate::error::ApiError;

pub(crate) struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Start a document with an XML declaration.
    pub(crate) fn new() -> Result<Self, ApiError> {
        let mut writer = Self {
            inner: Writer::new(Vec::new()),
        };
        writer.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(writer)
    }

    pub(crate) fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ApiError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write(Event::Start(start))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), ApiError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ApiError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write(Event::Empty(start))
    }

    pub(crate) fn text(&mut self, text: &str) -> Result<(), ApiError> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// `<name attrs>text</name>`
    pub(crate) fn leaf(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), ApiError> {
        self.open(name, attributes)?;
        self.text(text)?;
        self.close(name)
    }

    pub(crate) fn finish(self) -> Result<String, ApiError> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), ApiError> {
        self.inner
            .write_event(event)
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}

/// Element children only, skipping whitespace and comments.
pub(crate) fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// First element child with the given local name.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

/// Concatenated direct text content.
pub(crate) fn text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_escapes_text() {
        let mut w = XmlWriter::new().unwrap();
        w.leaf("string", &[], "a < b & c").unwrap();
        let xml = w.finish().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.ends_with("<string>a &lt; b &amp; c</string>"));
    }

    #[test]
    fn readers_skip_whitespace_nodes() {
        let doc = roxmltree::Document::parse("<a>\n  <b>x</b>\n  <c>y</c>\n</a>").unwrap();
        let root = doc.root_element();
        assert_eq!(elements(root).count(), 2);
        assert_eq!(child(root, "c").map(text).as_deref(), Some("y"));
        assert!(child(root, "d").is_none());
    }
}
