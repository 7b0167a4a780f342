use std::collections::HashMap;
use std::io;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

const INDENT: &[u8] = b"  ";

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed xml at byte {position}: {source}")]
    Syntax {
        position: u64,
        source: quick_xml::Error,
    },
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("content outside the root element")]
    OutsideRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped, entity references included.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prolog {
    DocType(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Escaped values.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Children go on their own indented lines when written. Set for
    /// containers built with [`Element::with_child`] and for parsed elements
    /// whose content carried formatting whitespace; never for mixed content.
    pub indent: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            indent: false,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self.indent = true;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(escape(text).into_owned()));
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: &str) {
        let name = name.into();
        let value = escape(value).into_owned();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| unescape_lossy(value))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    fn drop_formatting_whitespace(&mut self) {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Text(text) => !(text.contains('\n') && text.trim().is_empty()),
            _ => true,
        });
        self.indent = self.children.len() < before;
    }

    fn has_character_data(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, Node::Text(_) | Node::CData(_)))
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Element(child) => collect_text(child, out),
            Node::Text(text) => out.push_str(&unescape_lossy(text)),
            Node::CData(text) => out.push_str(text),
            Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
}

fn unescape_lossy(raw: &str) -> String {
    match unescape(raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.to_owned(),
    }
}

/// Prefix (`""` for the default namespace) to URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope(HashMap<String, String>);

impl NamespaceScope {
    pub fn enter(&self, element: &Element) -> NamespaceScope {
        let mut scope = self.clone();
        for (key, value) in &element.attributes {
            if key == "xmlns" {
                scope.0.insert(String::new(), unescape_lossy(value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.0.insert(prefix.to_owned(), unescape_lossy(value));
            }
        }
        scope
    }

    pub fn resolve<'n>(&self, qname: &'n str) -> (Option<&str>, &'n str) {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        (self.0.get(prefix).map(String::as_str), local)
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        let mut prefixes = self
            .0
            .iter()
            .filter(|(_, value)| value.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
            .collect::<Vec<_>>();
        prefixes.sort_unstable();
        prefixes.first().copied()
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: Vec<usize>,
    pub scope: NamespaceScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub prolog: Vec<Prolog>,
    pub root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
        }
    }

    pub fn parse(input: &str) -> Result<Self, XmlError> {
        parse(input)
    }

    /// First element (document order) named `{ns}child` whose parent is
    /// `{ns}parent`, matched by namespace URI rather than prefix.
    pub fn locate_child_of(&self, ns: &str, parent: &str, child: &str) -> Option<Located> {
        let scope = NamespaceScope::default().enter(&self.root);
        let mut path = Vec::new();
        locate_in(&self.root, &scope, ns, parent, child, &mut path)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for idx in path {
            current = match current.children.get(*idx) {
                Some(Node::Element(element)) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for idx in path {
            current = match current.children.get_mut(*idx) {
                Some(Node::Element(element)) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn write_to<W: io::Write>(&self, out: W) -> io::Result<()> {
        let mut writer = Writer::new(out);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.get_mut().write_all(b"\n")?;
        for item in &self.prolog {
            match item {
                Prolog::DocType(raw) => {
                    writer.write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))?
                }
                Prolog::Comment(raw) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?
                }
                Prolog::ProcessingInstruction(raw) => {
                    writer.write_event(Event::PI(BytesPI::new(raw.as_str())))?
                }
            }
            writer.get_mut().write_all(b"\n")?;
        }
        write_element(&mut writer, &self.root, Some(0))?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

fn locate_in(
    element: &Element,
    scope: &NamespaceScope,
    ns: &str,
    parent: &str,
    child: &str,
    path: &mut Vec<usize>,
) -> Option<Located> {
    let is_parent = scope.resolve(&element.name) == (Some(ns), parent);

    for (idx, node) in element.children.iter().enumerate() {
        let Node::Element(next) = node else {
            continue;
        };
        let next_scope = scope.enter(next);
        path.push(idx);
        if is_parent && next_scope.resolve(&next.name) == (Some(ns), child) {
            return Some(Located {
                path: path.clone(),
                scope: next_scope,
            });
        }
        if let Some(found) = locate_in(next, &next_scope, ns, parent, child, path) {
            return Some(found);
        }
        path.pop();
    }

    None
}

fn write_element<W: io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    depth: Option<usize>,
) -> io::Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute::from((key.as_bytes(), value.as_bytes())));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;

    let child_depth = match depth {
        Some(depth) if element.indent && !element.has_character_data() => Some(depth + 1),
        _ => None,
    };
    for node in &element.children {
        if let Some(depth) = child_depth {
            write_indent(writer, depth)?;
        }
        match node {
            Node::Element(child) => write_element(writer, child, child_depth)?,
            Node::Text(raw) => writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?,
            Node::CData(raw) => writer.write_event(Event::CData(BytesCData::new(raw.as_str())))?,
            Node::Comment(raw) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?
            }
            Node::ProcessingInstruction(raw) => {
                writer.write_event(Event::PI(BytesPI::new(raw.as_str())))?
            }
        }
    }
    if let (Some(depth), Some(_)) = (depth, child_depth) {
        write_indent(writer, depth)?;
    }

    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))
}

fn write_indent<W: io::Write>(writer: &mut Writer<W>, depth: usize) -> io::Result<()> {
    let out = writer.get_mut();
    out.write_all(b"\n")?;
    for _ in 0..depth {
        out.write_all(INDENT)?;
    }
    Ok(())
}

fn parse(input: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut prolog = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|source| XmlError::Syntax {
            position: reader.error_position(),
            source,
        })?;

        match event {
            Event::Start(start) => {
                let element = element_from_start(&start).map_err(|source| XmlError::Syntax {
                    position: reader.buffer_position(),
                    source,
                })?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start).map_err(|source| XmlError::Syntax {
                    position: reader.buffer_position(),
                    source,
                })?;
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Event::End(_) => {
                let Some(mut element) = stack.pop() else {
                    return Err(XmlError::OutsideRoot);
                };
                element.drop_formatting_whitespace();
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Event::Text(text) => push_text(&mut stack, &String::from_utf8_lossy(&text))?,
            Event::GeneralRef(reference) => {
                let raw = format!("&{};", String::from_utf8_lossy(&reference));
                push_text(&mut stack, &raw)?;
            }
            Event::CData(data) => {
                let node = Node::CData(String::from_utf8_lossy(&data).into_owned());
                attach(&mut stack, &mut root, node)?;
            }
            Event::Comment(comment) => {
                let raw = String::from_utf8_lossy(&comment).into_owned();
                if stack.is_empty() {
                    // Comments after the root element are dropped.
                    if root.is_none() {
                        prolog.push(Prolog::Comment(raw));
                    }
                } else {
                    attach(&mut stack, &mut root, Node::Comment(raw))?;
                }
            }
            Event::PI(pi) => {
                let raw = String::from_utf8_lossy(&pi).into_owned();
                if stack.is_empty() {
                    if root.is_none() {
                        prolog.push(Prolog::ProcessingInstruction(raw));
                    }
                } else {
                    attach(&mut stack, &mut root, Node::ProcessingInstruction(raw))?;
                }
            }
            Event::DocType(doctype) => {
                prolog.push(Prolog::DocType(
                    String::from_utf8_lossy(&doctype).into_owned(),
                ));
            }
            Event::Decl(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.name.clone()));
    }
    let root = root.ok_or(XmlError::NoRoot)?;
    Ok(XmlDocument { prolog, root })
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    node: Node,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }

    match node {
        Node::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        Node::Element(_) => Err(XmlError::MultipleRoots),
        _ => Err(XmlError::OutsideRoot),
    }
}

fn push_text(stack: &mut [Element], raw: &str) -> Result<(), XmlError> {
    let Some(parent) = stack.last_mut() else {
        if raw.trim().is_empty() {
            return Ok(());
        }
        return Err(XmlError::OutsideRoot);
    };

    match parent.children.last_mut() {
        Some(Node::Text(existing)) => existing.push_str(raw),
        _ => parent.children.push(Node::Text(raw.to_owned())),
    }
    Ok(())
}
