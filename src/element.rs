//! Element-tree (XML) surface syntax.
//!
//! Documents are read into an owned [`Element`] tree so the attribute filter
//! can prune it in place before canonicalization. Whitespace-only text between
//! child elements is dropped; leaf text is kept verbatim (a comment prefix
//! such as `"# "` depends on its trailing space).
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{ResolveError, Result};

/// One element of an element-tree document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Leaf text (empty for container elements).
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: set leaf text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: append a child.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Leaf element `<name>text</name>`.
    #[must_use]
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Value of a named attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the element has neither text nor children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.children.is_empty()
    }

    /// Parse a document. Returns `None` when it has no root element.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Parse`] for malformed XML.
    pub fn parse(text: &str, origin: &str) -> Result<Option<Self>> {
        let parse_error = |message: String| ResolveError::Parse {
            syntax: "xml",
            origin: origin.to_string(),
            message,
        };

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| parse_error(format!("at byte {}: {e}", reader.error_position())))?;
            match event {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start).map_err(parse_error)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start).map_err(parse_error)?;
                    attach(&mut stack, &mut root, element).map_err(parse_error)?;
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| parse_error("unbalanced end tag".to_string()))?;
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }
                    attach(&mut stack, &mut root, element).map_err(parse_error)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| parse_error(e.to_string()))?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(parse_error(format!(
                                "text outside the root element: {}",
                                text.trim()
                            )));
                        }
                    }
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(parse_error(format!("unclosed element <{}>", open.name)));
        }
        Ok(root)
    }

    fn from_start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let mut element = Self::new(name);
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|e| e.to_string())?
                .to_string();
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            element.attributes.push((key, value.into_owned()));
        }
        Ok(element)
    }

    /// Render as compact XML with no insignificant whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Encode`] when the writer rejects an event.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_xml(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| self.encode_error(&e))
    }

    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| self.encode_error(&e));
        }
        writer
            .write_event(Event::Start(start))
            .map_err(|e| self.encode_error(&e))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| self.encode_error(&e))?;
        }
        for child in &self.children {
            child.write_xml(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| self.encode_error(&e))
    }

    fn encode_error(&self, error: &dyn std::fmt::Display) -> ResolveError {
        ResolveError::Encode {
            element: self.name.clone(),
            message: error.to_string(),
        }
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> std::result::Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!("second root element <{}>", element.name))
    }
}
