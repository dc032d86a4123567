//! Namespace-aware element tree shared by the format decoders.
//!
//! Documents are read once with `quick-xml`'s [`NsReader`] into a small owned tree,
//! then each decoder walks the tree for its own vocabulary. Mixed content is kept in
//! document order so Atom `xhtml` bodies can be written back out.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Writer;

use super::DecodeError;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const ATOM03_NS: &str = "http://purl.org/atom/ns#";
pub const RSS1_NS: &str = "http://purl.org/rss/1.0/";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub const ENCLOSURE_NS: &str = "http://purl.oclc.org/net/rss_2.0/enc#";

/// A child of an [`Element`]: either a nested element or a run of character data.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An element with its resolved namespace URI and local name.
///
/// An unbound prefix (for example `atom:link` with no matching `xmlns:atom`) is kept
/// as the namespace so it never passes for an unqualified element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub nodes: Vec<Node>,
}

impl Element {
    fn new(namespace: Option<String>, name: String, attributes: Vec<Attribute>) -> Self {
        Self {
            namespace,
            name,
            attributes,
            nodes: Vec::new(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// True when the element has local name `name` in namespace `ns`.
    pub fn is(&self, ns: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace() == ns
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Direct children with local name `name`, in any namespace.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// Direct children with local name `name` in namespace `ns`.
    pub fn children_ns<'a>(
        &'a self,
        ns: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(Some(ns), name))
    }

    /// First child named `name`, preferring an unqualified element over a prefixed one,
    /// so `<title>` wins over `<media:title>` regardless of order.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements()
            .find(|e| e.is(None, name))
            .or_else(|| self.elements().find(|e| e.name == name))
    }

    pub fn child_ns(&self, ns: &str, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(Some(ns), name))
    }

    /// Text of [`Element::child`], or `""` when the child is missing.
    pub fn child_text(&self, name: &str) -> String {
        self.child(name).map(Element::text).unwrap_or_default()
    }

    pub fn child_text_ns(&self, ns: &str, name: &str) -> String {
        self.child_ns(ns, name).map(Element::text).unwrap_or_default()
    }

    /// Concatenated direct character data, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }

    /// Value of an unqualified attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attr_ns(&self, ns: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(ns) && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Serializes the element's content (not the element itself) back to markup.
    ///
    /// Prefixes are not preserved; elements are written with their local names.
    pub fn inner_xml(&self) -> std::io::Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &Node) -> std::io::Result<()> {
    match node {
        Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text))),
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for attr in &element.attributes {
                if attr.namespace.is_none() {
                    start.push_attribute((attr.name.as_str(), attr.value.as_str()));
                }
            }
            if element.nodes.is_empty() {
                return writer.write_event(Event::Empty(start));
            }
            writer.write_event(Event::Start(start))?;
            for child in &element.nodes {
                write_node(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))
        }
    }
}

fn namespace_of(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unknown(prefix) => Some(String::from_utf8_lossy(&prefix).into_owned()),
        ResolveResult::Unbound => None,
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    e: &BytesStart<'_>,
) -> Element {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::debug!(element = %name, error = %e, "Skipping malformed attribute");
                continue;
            }
        };
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let value = match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attributes.push(Attribute {
            namespace: namespace_of(resolved),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value,
        });
    }

    Element::new(namespace, name, attributes)
}

fn push_text(stack: &mut [Element], text: Cow<'_, str>) {
    if let Some(current) = stack.last_mut() {
        if let Some(Node::Text(prev)) = current.nodes.last_mut() {
            prev.push_str(&text);
        } else {
            current.nodes.push(Node::Text(text.into_owned()));
        }
    }
}

/// Unescapes reference by reference, keeping any that fail (`&nbsp;`) as written.
fn unescape_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let reference = &tail[..=end];
        match unescape(reference) {
            Ok(text) => out.push_str(&text),
            Err(_) => out.push_str(reference),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Parses `bytes` into the document's root element.
///
/// Text that fails entity unescaping (HTML entities such as `&nbsp;` are common in
/// feeds) is kept raw instead of failing the document.
///
/// # Errors
///
/// - [`DecodeError::Empty`] when there is no root element
/// - [`DecodeError::Xml`] for malformed markup (mismatched end tags and similar)
/// - [`DecodeError::MaxDepthExceeded`] when nesting exceeds `max_depth`
pub fn parse_document(bytes: &[u8], max_depth: usize) -> Result<Element, DecodeError> {
    // quick-xml (0.37) never expands <!ENTITY> declarations, only the five XML builtins.
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| DecodeError::Xml(e.to_string()))?;
        let namespace = namespace_of(resolved);

        match event {
            Event::Start(e) => {
                if stack.len() >= max_depth {
                    return Err(DecodeError::MaxDepthExceeded(max_depth));
                }
                let element = open_element(&reader, namespace, &e);
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(&reader, namespace, &e);
                match stack.last_mut() {
                    Some(parent) => parent.nodes.push(Node::Element(element)),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(DecodeError::Xml("unexpected end tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.nodes.push(Node::Element(done)),
                    None => return Ok(done),
                }
            }
            Event::Text(e) => {
                let text = match e.unescape() {
                    Ok(text) => text,
                    Err(_) => unescape_lenient(&String::from_utf8_lossy(&e)).into(),
                };
                push_text(&mut stack, text);
            }
            Event::CData(e) => {
                push_text(&mut stack, String::from_utf8_lossy(&e));
            }
            Event::Eof => {
                if stack.is_empty() {
                    return Err(DecodeError::Empty);
                }
                return Err(DecodeError::Xml("unexpected end of document".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
}
