use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::MasterfileError;

/// A node in a parsed package part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An XML element with its qualified name (`a:tbl`) and attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Local part of a qualified name: `a:tbl` -> `tbl`.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Namespace prefix of a qualified name, including the colon: `a:tbl` -> `a:`.
pub fn prefix_of(name: &str) -> &str {
    name.rsplit_once(':')
        .map_or("", |(prefix, _)| &name[..prefix.len() + 1])
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn local(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local() == local
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(local))
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.is(local))
    }

    /// First child with this local name, appended as `qualified` when missing.
    pub fn ensure_child(&mut self, local: &str, qualified: &str) -> &mut Element {
        let pos = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(local)));
        let pos = match pos {
            Some(pos) => pos,
            None => {
                self.children.push(Node::Element(Element::new(qualified)));
                self.children.len() - 1
            }
        };
        match &mut self.children[pos] {
            Node::Element(e) => e,
            _ => unreachable!("position matched an element"),
        }
    }

    /// Remove every child element with this local name.
    pub fn remove_children(&mut self, local: &str) {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.is(local)));
    }

    /// Depth-first search for the first descendant with this local name.
    pub fn find(&self, local: &str) -> Option<&Element> {
        for child in self.elements() {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.find(local) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        for child in self.elements_mut() {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(local) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant with this local name, in document order.
    pub fn find_all<'a>(&'a self, local: &str, out: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.is(local) {
                out.push(child);
            }
            child.find_all(local, out);
        }
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }
}

/// A parsed package part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn parse(xml: &str, part: &str) -> Result<Self, MasterfileError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader
                .read_event()
                .map_err(|e| MasterfileError::xml(part, e))?
            {
                Event::Start(start) => stack.push(element_from(&start, part)?),
                Event::Empty(start) => {
                    let element = element_from(&start, part)?;
                    attach(&mut stack, &mut root, element, part)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| MasterfileError::xml(part, "unbalanced end tag"))?;
                    attach(&mut stack, &mut root, element, part)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| MasterfileError::xml(part, e))?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(Node::CData(text));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                        parent.children.push(Node::Comment(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(MasterfileError::xml(part, "unclosed element at end of part"));
        }
        let root = root.ok_or_else(|| MasterfileError::xml(part, "no root element"))?;
        Ok(Document { root })
    }

    /// Serialize with the standalone UTF-8 declaration Office writes.
    pub fn to_bytes(&self, part: &str) -> Result<Vec<u8>, MasterfileError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(|e| MasterfileError::xml(part, e))?;
        writer.get_mut().extend_from_slice(b"\r\n");
        write_element(&mut writer, &self.root, part)?;
        Ok(writer.into_inner())
    }
}

fn element_from(start: &BytesStart<'_>, part: &str) -> Result<Element, MasterfileError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| MasterfileError::xml(part, e))?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MasterfileError::xml(part, e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| MasterfileError::xml(part, e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| MasterfileError::xml(part, e))?
            .into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    part: &str,
) -> Result<(), MasterfileError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(MasterfileError::xml(part, "more than one root element")),
    }
    Ok(())
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    part: &str,
) -> Result<(), MasterfileError> {
    let start = BytesStart::new(element.name.as_str())
        .with_attributes(element.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| MasterfileError::xml(part, e));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| MasterfileError::xml(part, e))?;
    for child in &element.children {
        let event = match child {
            Node::Element(e) => {
                write_element(writer, e, part)?;
                continue;
            }
            Node::Text(t) => Event::Text(BytesText::new(t)),
            Node::CData(t) => Event::CData(BytesCData::new(t.as_str())),
            Node::Comment(t) => Event::Comment(BytesText::from_escaped(t.as_str())),
        };
        writer
            .write_event(event)
            .map_err(|e| MasterfileError::xml(part, e))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| MasterfileError::xml(part, e))
}
