//! Minimal mutable XML document tree.
//!
//! The project descriptor mixes tool-managed declarations with arbitrary
//! user-authored markup, so the adapter works on a full element tree instead
//! of a typed serde mapping: elements, attribute order, text and comments all
//! survive a load, mutate, save cycle. Whitespace between elements is
//! normalized to 4-space indentation on render.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::{ProjectError, ProjectResult};

/// A node inside an element: nested element, text run, or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed document: comments around the root element are kept so they
/// are not lost when the file is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub preamble: Vec<String>,
    pub root: XmlElement,
    pub trailing: Vec<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing in place to keep attribute order stable.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name.to_string(), value));
        }
    }

    /// Concatenated direct text content, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }

    /// Direct child elements with the given name.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// First direct child element with the given name.
    pub fn first_named(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn push_child(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Remove direct child elements with the given name that match `pred`.
    /// Returns how many were removed.
    pub fn remove_elements<F>(&mut self, name: &str, mut pred: F) -> usize
    where
        F: FnMut(&XmlElement) -> bool,
    {
        let before = self.children.len();
        self.children.retain(|node| match node {
            XmlNode::Element(el) if el.name == name => !pred(el),
            _ => true,
        });
        before - self.children.len()
    }
}

fn xml_err(err: impl std::fmt::Display) -> ProjectError {
    ProjectError::Xml(err.to_string())
}

/// Resolve a general entity or character reference to literal text.
/// Unrecognized entities are carried through verbatim.
fn resolve_reference(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = name.strip_prefix("#x").map_or_else(
                || name.strip_prefix('#').and_then(|d| d.parse::<u32>().ok()),
                |h| u32::from_str_radix(h, 16).ok(),
            );
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{name};"), |c| c.to_string())
        }
    }
}

fn append_text(stack: &mut [XmlElement], text: &str) -> ProjectResult<()> {
    if let Some(parent) = stack.last_mut() {
        // merge adjacent runs so entity references stay inside one text node
        if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
            existing.push_str(text);
        } else {
            parent.push_text(text);
        }
        Ok(())
    } else if text.trim().is_empty() {
        Ok(())
    } else {
        Err(ProjectError::Xml("text content outside the root element".to_string()))
    }
}

/// Parse a complete XML document.
pub fn parse_document(input: &str) -> ProjectResult<XmlDocument> {
    let mut reader = Reader::from_str(input);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut preamble = Vec::new();
    let mut trailing = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(element_from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let el = element_from_start(e)?;
                place_element(&mut stack, &mut root, el)?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| ProjectError::Xml("unexpected closing tag".to_string()))?;
                place_element(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(ref t)) => {
                let text = t.decode().map_err(xml_err)?;
                if !text.trim().is_empty() {
                    append_text(&mut stack, &text)?;
                }
            }
            Ok(Event::GeneralRef(ref r)) => {
                let name = String::from_utf8_lossy(r.as_ref()).into_owned();
                append_text(&mut stack, &resolve_reference(&name))?;
            }
            Ok(Event::CData(ref t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                append_text(&mut stack, &text)?;
            }
            Ok(Event::Comment(ref t)) => {
                let comment = String::from_utf8_lossy(t.as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Comment(comment));
                } else if root.is_none() {
                    preamble.push(comment);
                } else {
                    trailing.push(comment);
                }
            }
            Ok(Event::Eof) => break,
            // declaration, doctype and processing instructions are regenerated
            Ok(_) => {}
            Err(e) => {
                return Err(ProjectError::Xml(format!(
                    "parse error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ProjectError::Xml(format!("unclosed element <{}>", open.name)));
    }
    let root = root.ok_or_else(|| ProjectError::Xml("document has no root element".to_string()))?;
    Ok(XmlDocument { preamble, root, trailing })
}

fn element_from_start(e: &BytesStart<'_>) -> ProjectResult<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn place_element(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> ProjectResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(el);
        Ok(())
    } else if root.is_none() {
        *root = Some(el);
        Ok(())
    } else {
        Err(ProjectError::Xml("document has more than one root element".to_string()))
    }
}

/// Render a document with an XML declaration and 4-space indentation.
pub fn render_document(doc: &XmlDocument) -> ProjectResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_err)?;
    for comment in &doc.preamble {
        writer
            .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
            .map_err(xml_err)?;
    }
    write_element(&mut writer, &doc.root)?;
    for comment in &doc.trailing {
        writer
            .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
            .map_err(xml_err)?;
    }
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(xml_err)
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &XmlElement) -> ProjectResult<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    for child in &el.children {
        match child {
            XmlNode::Element(nested) => write_element(writer, nested)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_err)?,
            XmlNode::Comment(comment) => writer
                .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
                .map_err(xml_err)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_err)?;
    Ok(())
}
