//! Minimal element tree built on quick-xml for CAS response parsing.
//!
//! Element names are namespace-prefix stripped. With `normalize` set they are
//! also lowercased, matching how CAS 2.0/3.0 responses are addressed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// A parsed XML element.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, normalize: bool) -> Result<Self, String> {
        let mut name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        if normalize {
            name = name.to_lowercase();
        }

        let mut attributes = HashMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("Malformed attribute on <{}>: {}", name, e))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| format!("Malformed attribute value on <{}>: {}", name, e))?;
            attributes.insert(key, value.to_string());
        }

        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Trimmed text content of this element.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parse a complete document into its root element.
pub(crate) fn parse_document(xml: &str, normalize: bool) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element::from_start(e, normalize)?),
            Ok(Event::Empty(ref e)) => {
                let element = Element::from_start(e, normalize)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "Unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(|e| format!("Bad text node: {}", e))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).to_string();
                push_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("Unclosed element <{}>", open.name));
    }

    root.ok_or_else(|| "Document has no root element".to_string())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_some() => Err("Multiple root elements".to_string()),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("Text outside of root element".to_string()),
    }
}
