//! A small owned element tree over quick-xml, used to read package parts,
//! edit them in place and write them back.

use outbrief_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// DrawingML main namespace.
pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// Office document relationships namespace.
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// PresentationML namespace.
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// An XML element with its qualified name, attributes and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Child content of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attribute value by qualified name, e.g. `id` or `r:id`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Child elements, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.local_name() == local)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Follow a path of local names from this element.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |element, local| element.child(local))
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("Invalid attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlError(format!("Invalid attribute value: {}", e)))?;
        element
            .attributes
            .push((String::from_utf8_lossy(attr.key.as_ref()).to_string(), value.to_string()));
    }
    Ok(element)
}

/// Parse a document into its root element. Declarations, comments and
/// processing instructions are dropped.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    let mut close = |element: Element, stack: &mut Vec<Element>| match stack.last_mut() {
        Some(parent) => parent.push(element),
        None => root = Some(element),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e)?;
                close(element, &mut stack);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::XmlError("Unbalanced end tag".into()))?;
                close(element, &mut stack);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("Invalid text: {}", e)))?;
                    current.children.push(Node::Text(text.to_string()));
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .children
                        .push(Node::Text(String::from_utf8_lossy(e).to_string()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlError("Unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::XmlError("Document has no root element".into()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))
}

/// Serialize a document with a standalone XML declaration.
pub fn write(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    emit(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(Element::new("p:sp").local_name(), "sp");
        assert_eq!(Element::new("a:t").local_name(), "t");
        assert_eq!(Element::new("sp").local_name(), "sp");
    }

    #[test]
    fn test_parse_tree() {
        let root = parse(
            r#"<?xml version="1.0"?>
<p:sld xmlns:p="urn:p"><p:cSld name="Cover"><a:t>A &amp; B</a:t><p:ph idx="1"/></p:cSld></p:sld>"#,
        )
        .unwrap();

        assert_eq!(root.local_name(), "sld");
        let c_sld = root.child("cSld").unwrap();
        assert_eq!(c_sld.attr("name"), Some("Cover"));
        assert_eq!(root.find(&["cSld", "t"]).unwrap().text(), "A & B");
        assert_eq!(root.find(&["cSld", "ph"]).unwrap().attr("idx"), Some("1"));
        assert!(root.find(&["cSld", "missing"]).is_none());
    }

    #[test]
    fn test_write_escapes_and_reparses() {
        let root = Element::new("a:p")
            .with_attr("name", "Fish & \"Chips\"")
            .with_child(Element::new("a:t").with_text("1 < 2"))
            .with_child(Element::new("a:br"));
        let bytes = write(&root).unwrap();
        let xml = String::from_utf8(bytes).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(xml.contains("1 &lt; 2"));
        assert!(xml.contains("<a:br/>"));
        assert_eq!(parse(&xml).unwrap(), root);
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("").is_err());
    }
}
