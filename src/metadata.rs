//! In-memory metadata records.
//!
//! A [`MetadataDocument`] is a small element tree built from `quick-xml`
//! events. Elements are addressed with ElementTree-style paths:
//!
//! | Path | Meaning |
//! |------|---------|
//! | `a/b` | child `b` of child `a` of the root |
//! | `.//a/b` | child `b` of any `a` below the root |
//! | `./a` | same as `a` |
//!
//! The semantic fields used by the identifier workflow are listed in
//! [`MetadataField`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

use crate::error::ArkError;

/// Named locations inside an ArcGIS-style metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    AltTitle,
    Rights,
    CitationIdentifier,
    CitationBlock,
    MetadataFileId,
    DatasetUri,
    ContactHours,
    TimeRangeBegin,
    TimeRangeEnd,
    TimeInstant,
}

impl MetadataField {
    pub fn path(&self) -> &'static str {
        match self {
            MetadataField::AltTitle => ".//idCitation/resAltTitle",
            MetadataField::Rights => ".//othConsts",
            MetadataField::CitationIdentifier => ".//citId/identCode",
            MetadataField::CitationBlock => "dataIdInfo/idCitation",
            MetadataField::MetadataFileId => ".//mdFileID",
            MetadataField::DatasetUri => ".//dataSetURI",
            MetadataField::ContactHours => ".//cntHours",
            MetadataField::TimeRangeBegin => ".//tmBegin",
            MetadataField::TimeRangeEnd => ".//tmEnd",
            MetadataField::TimeInstant => ".//tmPosition",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// Markup before or after the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misc {
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl Misc {
    fn write(&self, out: &mut String) {
        match self {
            Misc::Comment(c) => out.push_str(&format!("<!--{}-->", c)),
            Misc::ProcessingInstruction(p) => out.push_str(&format!("<?{}?>", p)),
            Misc::DocType(d) => out.push_str(&format!("<!DOCTYPE {}>", d)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Concatenated direct text content, or `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let mut out = String::new();
        let mut found = false;
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => {
                    out.push_str(t);
                    found = true;
                }
                _ => {}
            }
        }
        found.then_some(out)
    }

    /// Replace all direct text content with `text`. Child elements are kept.
    pub fn set_text(&mut self, text: &str) {
        self.children
            .retain(|c| !matches!(c, Node::Text(_) | Node::CData(_)));
        self.children.insert(0, Node::Text(text.to_string()));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.name.rsplit(':').next() == Some(name)
    }
}

/// Position of an element as child indices from the root.
type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step<'p> {
    name: &'p str,
    descendant: bool,
}

fn parse_path(path: &str) -> Vec<Step<'_>> {
    let mut rest = path.strip_prefix('.').unwrap_or(path);
    let mut steps = Vec::new();
    let mut descendant = false;
    if let Some(r) = rest.strip_prefix("//") {
        descendant = true;
        rest = r;
    } else if let Some(r) = rest.strip_prefix('/') {
        rest = r;
    }
    for part in rest.split('/') {
        if part.is_empty() {
            descendant = true;
            continue;
        }
        steps.push(Step {
            name: part,
            descendant,
        });
        descendant = false;
    }
    steps
}

/// A parsed metadata record.
///
/// The XML declaration is kept verbatim, and comments, processing
/// instructions, and the doctype around the root element are kept in order,
/// so a load/save cycle only changes what the caller changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDocument {
    declaration: Option<String>,
    prolog: Vec<Misc>,
    root: Element,
    epilog: Vec<Misc>,
}

impl MetadataDocument {
    pub fn parse(xml: &str) -> Result<Self, ArkError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Decl(d) => declaration = Some(String::from_utf8_lossy(&d).into_owned()),
                Event::DocType(t) => {
                    let doctype = String::from_utf8_lossy(&t).trim().to_string();
                    outside_root(&root, &mut prolog, &mut epilog).push(Misc::DocType(doctype));
                }
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ArkError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(xml_err)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => return Err(ArkError::Xml("text outside the root element".into())),
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::CData(text));
                    }
                }
                Event::Comment(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Comment(text)),
                        None => outside_root(&root, &mut prolog, &mut epilog).push(Misc::Comment(text)),
                    }
                }
                Event::PI(p) => {
                    let text = String::from_utf8_lossy(&p).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::ProcessingInstruction(text)),
                        None => outside_root(&root, &mut prolog, &mut epilog)
                            .push(Misc::ProcessingInstruction(text)),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ArkError::Xml(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| ArkError::Xml("document has no root element".into()))?;

        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    /// Serialize back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(declaration) = &self.declaration {
            out.push_str(&format!("<?{}?>\n", declaration));
        }
        for misc in &self.prolog {
            misc.write(&mut out);
            out.push('\n');
        }
        write_element(&mut out, &self.root);
        out.push('\n');
        for misc in &self.epilog {
            misc.write(&mut out);
            out.push('\n');
        }
        out
    }

    /// First element matching `path`, in document order.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let first = self.locate_all(path).into_iter().next()?;
        self.element_at(&first)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Element> {
        let first = self.locate_all(path).into_iter().next()?;
        self.element_at_mut(&first)
    }

    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        self.locate_all(path)
            .iter()
            .filter_map(|p| self.element_at(p))
            .collect()
    }

    pub fn exists(&self, path: &str) -> bool {
        !self.locate_all(path).is_empty()
    }

    /// Text of the first element matching `path`.
    pub fn text(&self, path: &str) -> Option<String> {
        self.find(path).and_then(Element::text)
    }

    pub fn get(&self, field: MetadataField) -> Option<String> {
        self.text(field.path())
    }

    /// Set the text of every element matching `path`; returns how many matched.
    pub fn set_text_all(&mut self, path: &str, text: &str) -> usize {
        let paths = self.locate_all(path);
        let mut n = 0;
        for p in &paths {
            if let Some(element) = self.element_at_mut(p) {
                element.set_text(text);
                n += 1;
            }
        }
        n
    }

    /// Remove every match of `path` after the first; returns how many were removed.
    pub fn remove_duplicates(&mut self, path: &str) -> usize {
        let mut paths = self.locate_all(path);
        if paths.len() < 2 {
            return 0;
        }
        let mut extra = paths.split_off(1);
        // Later positions first so earlier index paths stay valid.
        extra.sort_unstable_by(|a, b| b.cmp(a));
        let mut removed = 0;
        for p in extra {
            if let Some((last, parent_path)) = p.split_last() {
                if let Some(parent) = self.element_at_mut(parent_path) {
                    parent.children.remove(*last);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Walk `chain` below the element at `parent_path` (the root when `None`),
    /// creating each missing link, and return the last element.
    ///
    /// Fails with [`ArkError::SchemaViolation`] when the parent does not exist.
    pub fn ensure_chain(
        &mut self,
        parent_path: Option<&str>,
        chain: &[&str],
    ) -> Result<&mut Element, ArkError> {
        let mut position: NodePath = match parent_path {
            None => Vec::new(),
            Some(p) => self.locate_all(p).into_iter().next().ok_or_else(|| {
                ArkError::SchemaViolation(format!("required element '{}' is missing", p))
            })?,
        };

        for name in chain {
            let parent = self
                .element_at_mut(&position)
                .ok_or_else(|| ArkError::SchemaViolation(format!("lost element at '{}'", name)))?;
            let existing = parent
                .children
                .iter()
                .position(|c| matches!(c, Node::Element(e) if e.matches(name)));
            let index = match existing {
                Some(i) => i,
                None => {
                    tracing::debug!(element = %name, parent = %parent.name, "creating element");
                    parent.children.push(Node::Element(Element::new(*name)));
                    parent.children.len() - 1
                }
            };
            position.push(index);
        }

        self.element_at_mut(&position)
            .ok_or_else(|| ArkError::SchemaViolation("element chain could not be resolved".into()))
    }

    fn locate_all(&self, path: &str) -> Vec<NodePath> {
        let mut current: Vec<NodePath> = vec![Vec::new()];
        for step in parse_path(path) {
            let mut next: Vec<NodePath> = Vec::new();
            for base in &current {
                let Some(element) = self.element_at(base) else {
                    continue;
                };
                if step.descendant {
                    collect_descendants(element, base, step.name, &mut next);
                } else {
                    for (i, child) in element.children.iter().enumerate() {
                        if let Node::Element(e) = child {
                            if e.matches(step.name) {
                                let mut p = base.clone();
                                p.push(i);
                                next.push(p);
                            }
                        }
                    }
                }
            }
            next.sort();
            next.dedup();
            current = next;
        }
        current
    }

    fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for &i in path {
            current = match current.children.get(i) {
                Some(Node::Element(e)) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for &i in path {
            current = match current.children.get_mut(i) {
                Some(Node::Element(e)) => e,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn collect_descendants(element: &Element, base: &[usize], name: &str, out: &mut Vec<NodePath>) {
    for (i, child) in element.children.iter().enumerate() {
        if let Node::Element(e) = child {
            let mut p = base.to_vec();
            p.push(i);
            if e.matches(name) {
                out.push(p.clone());
            }
            collect_descendants(e, &p, name, out);
        }
    }
}

fn outside_root<'v>(
    root: &Option<Element>,
    prolog: &'v mut Vec<Misc>,
    epilog: &'v mut Vec<Misc>,
) -> &'v mut Vec<Misc> {
    if root.is_none() {
        prolog
    } else {
        epilog
    }
}

fn xml_err(e: impl fmt::Display) -> ArkError {
    ArkError::Xml(e.to_string())
}

fn element_from_start(start: &BytesStart) -> Result<Element, ArkError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ArkError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(ArkError::Xml("more than one root element".into())),
    }
    Ok(())
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", key, quick_xml::escape::escape(value.as_str())));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(out, e),
            Node::Text(t) => out.push_str(&quick_xml::escape::escape(t.as_str())),
            Node::CData(t) => out.push_str(&format!("<![CDATA[{}]]>", t)),
            Node::Comment(t) => out.push_str(&format!("<!--{}-->", t)),
            Node::ProcessingInstruction(t) => out.push_str(&format!("<?{}?>", t)),
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
