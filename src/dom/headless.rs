//! Arena-backed in-memory DOM.
//!
//! Backs the test suite and headless embedding: nodes live in a flat arena
//! addressed by [`NodeId`], markup templates are parsed with html5ever, and
//! layout is supplied as fixtures (`set_layout`, `set_viewport`) since no
//! real layout engine runs here.
//!
//! Selector support is the compound simple-selector subset the widget's own
//! configuration uses: `tag`, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! in any combination, no combinators.

use std::collections::BTreeMap;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use log::warn;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::dom::{Dom, DomError, NodeId};
use crate::geometry::{Point, Rect, Size};

#[derive(Debug, Default)]
struct ElementData {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    layout: Rect,
    offset_top: f64,
    z_index: Option<i32>,
}

#[derive(Debug)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct ArenaNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// In-memory DOM backend.
#[derive(Debug)]
pub struct HeadlessDom {
    nodes: Vec<ArenaNode>,
    body: NodeId,
    viewport: Size,
    scroll: Point,
}

impl Default for HeadlessDom {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDom {
    /// Empty document: a bare body and a 1280x800 viewport.
    pub fn new() -> Self {
        Self::with_viewport(1280.0, 800.0)
    }

    pub fn with_viewport(width: f64, height: f64) -> Self {
        let body = ArenaNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(ElementData {
                tag: "body".to_string(),
                ..ElementData::default()
            }),
        };
        Self {
            nodes: vec![body],
            body: NodeId(0),
            viewport: Size::new(width, height),
            scroll: Point::zero(),
        }
    }

    /// Parse a fragment and append it to `parent`. Fixture helper for
    /// building page content in tests.
    pub fn insert_markup(&mut self, parent: NodeId, markup: &str) -> Result<NodeId, DomError> {
        let node = self.create_from_markup(markup)?;
        self.append_child(parent, node);
        Ok(node)
    }

    /// Fix the viewport-relative bounding rect reported for `node`.
    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        if let Some(el) = self.element_mut(node) {
            el.layout = rect;
        }
    }

    /// Fix the `offsetTop` reported for `node`.
    pub fn set_offset_top(&mut self, node: NodeId, top: f64) {
        if let Some(el) = self.element_mut(node) {
            el.offset_top = top;
        }
    }

    /// Fix the computed z-index reported for `node`.
    pub fn set_z_index(&mut self, node: NodeId, z_index: i32) {
        if let Some(el) = self.element_mut(node) {
            el.z_index = Some(z_index);
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll.y
    }

    /// Inline style value previously set through the [`Dom`] trait.
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.element(node)?.styles.get(property).cloned()
    }

    /// Concatenated text content of the node's subtree.
    pub fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Whether the node is still reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.body {
                return true;
            }
            match self.nodes[current.index()].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Number of element nodes currently attached under the body.
    pub fn attached_element_count(&self) -> usize {
        self.descendants(self.body)
            .iter()
            .filter(|&&id| matches!(self.nodes[id.index()].data, NodeData::Element(_)))
            .count()
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.index()].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &self.nodes[node.index()].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.index())?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.index())?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    /// Preorder traversal of the subtree rooted at `root`, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.index()]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.nodes[node.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    fn node_matches(&self, node: NodeId, selector: &SimpleSelector) -> bool {
        let Some(el) = self.element(node) else {
            return false;
        };
        if let Some(tag) = &selector.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &selector.id {
            if el.attrs.get("id") != Some(id) {
                return false;
            }
        }
        for class in &selector.classes {
            if !el.classes.iter().any(|c| c == class) {
                return false;
            }
        }
        for (name, expected) in &selector.attrs {
            let actual = if name == "class" {
                if el.classes.is_empty() {
                    None
                } else {
                    Some(el.classes.join(" "))
                }
            } else {
                el.attrs.get(name).cloned()
            };
            match (actual, expected) {
                (None, _) => return false,
                (Some(_), None) => {}
                (Some(actual), Some(expected)) => {
                    if actual != *expected {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn convert(&mut self, handle: &Handle, parent: Option<NodeId>) -> Option<NodeId> {
        match &handle.data {
            RcNodeData::Element { name, attrs, .. } => {
                let mut el = ElementData {
                    tag: name.local.as_ref().to_string(),
                    ..ElementData::default()
                };
                for attr in attrs.borrow().iter() {
                    let key = attr.name.local.as_ref().to_string();
                    let value = attr.value.to_string();
                    if key == "class" {
                        el.classes = value.split_whitespace().map(str::to_string).collect();
                    } else {
                        el.attrs.insert(key, value);
                    }
                }
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(ArenaNode {
                    parent,
                    children: Vec::new(),
                    data: NodeData::Element(el),
                });
                if let Some(parent) = parent {
                    self.nodes[parent.index()].children.push(id);
                }
                for child in handle.children.borrow().iter() {
                    self.convert(child, Some(id));
                }
                Some(id)
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(ArenaNode {
                    parent,
                    children: Vec::new(),
                    data: NodeData::Text(text),
                });
                if let Some(parent) = parent {
                    self.nodes[parent.index()].children.push(id);
                }
                Some(id)
            }
            _ => None,
        }
    }
}

impl Dom for HeadlessDom {
    fn body(&self) -> NodeId {
        self.body
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        let parsed = match parse_selector(selector) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("query: {err}");
                return None;
            }
        };
        if self.node_matches(self.body, &parsed) {
            return Some(self.body);
        }
        self.descendants(self.body)
            .into_iter()
            .find(|&node| self.node_matches(node, &parsed))
    }

    fn query_within(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let parsed = match parse_selector(selector) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("query_within: {err}");
                return None;
            }
        };
        self.descendants(root)
            .into_iter()
            .find(|&node| self.node_matches(node, &parsed))
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        let parsed = match parse_selector(selector) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("query_all: {err}");
                return Vec::new();
            }
        };
        self.descendants(self.body)
            .into_iter()
            .filter(|&node| self.node_matches(node, &parsed))
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        match parse_selector(selector) {
            Ok(parsed) => self.node_matches(node, &parsed),
            Err(err) => {
                warn!("matches: {err}");
                false
            }
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.parent
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.nodes[current.index()].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn create_from_markup(&mut self, markup: &str) -> Result<NodeId, DomError> {
        let rcdom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut markup.as_bytes())
            .map_err(|_| DomError::EmptyMarkup(markup.to_string()))?;

        // html5ever wraps fragments in html/head/body; the fragment's first
        // element ends up as the first element child of body.
        let body = find_body(&rcdom.document)
            .ok_or_else(|| DomError::EmptyMarkup(markup.to_string()))?;
        let first = body
            .children
            .borrow()
            .iter()
            .find(|child| matches!(child.data, RcNodeData::Element { .. }))
            .cloned()
            .ok_or_else(|| DomError::EmptyMarkup(markup.to_string()))?;

        self.convert(&first, None)
            .ok_or_else(|| DomError::EmptyMarkup(markup.to_string()))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.nodes[anchor.index()].parent else {
            warn!("insert_after: anchor {anchor:?} is detached");
            return;
        };
        self.detach(node);
        self.nodes[node.index()].parent = Some(parent);
        let children = &mut self.nodes[parent.index()].children;
        let position = children
            .iter()
            .position(|&c| c == anchor)
            .map_or(children.len(), |p| p + 1);
        children.insert(position, node);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node) {
            el.classes.retain(|c| c != class);
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            if name == "class" {
                el.classes = value.split_whitespace().map(str::to_string).collect();
            } else {
                el.attrs.insert(name.to_string(), value.to_string());
            }
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let el = self.element(node)?;
        if name == "class" {
            if el.classes.is_empty() {
                return None;
            }
            return Some(el.classes.join(" "));
        }
        el.attrs.get(name).cloned()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let children = std::mem::take(&mut self.nodes[node.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode {
            parent: Some(node),
            children: Vec::new(),
            data: NodeData::Text(text.to_string()),
        });
        self.nodes[node.index()].children.push(id);
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.element(node).map_or_else(Rect::zero, |el| el.layout)
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        self.element(node).map_or(0.0, |el| el.offset_top)
    }

    fn computed_z_index(&self, node: NodeId) -> Option<i32> {
        let el = self.element(node)?;
        if let Some(inline) = el.styles.get("z-index") {
            if let Ok(parsed) = inline.parse::<i32>() {
                return Some(parsed);
            }
        }
        el.z_index
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn scroll_offset(&self) -> Point {
        self.scroll
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.scroll.y = top;
    }
}

fn find_body(handle: &Handle) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == "body" {
            return Some(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_body(child) {
            return Some(found);
        }
    }
    None
}

/// A compound simple selector: optional tag plus id/class/attribute parts.
#[derive(Debug, Clone, Default, PartialEq)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn parse_selector(input: &str) -> Result<SimpleSelector, DomError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DomError::BadSelector(input.to_string()));
    }
    let bytes = s.as_bytes();
    let mut sel = SimpleSelector::default();
    let mut i = 0;

    let ident_end = |start: usize| {
        let mut j = start;
        while j < bytes.len()
            && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-' || bytes[j] == b'_')
        {
            j += 1;
        }
        j
    };

    if bytes[0].is_ascii_alphabetic() {
        let j = ident_end(0);
        sel.tag = Some(s[..j].to_ascii_lowercase());
        i = j;
    }

    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                let j = ident_end(i + 1);
                if j == i + 1 {
                    return Err(DomError::BadSelector(input.to_string()));
                }
                sel.classes.push(s[i + 1..j].to_string());
                i = j;
            }
            b'#' => {
                let j = ident_end(i + 1);
                if j == i + 1 {
                    return Err(DomError::BadSelector(input.to_string()));
                }
                sel.id = Some(s[i + 1..j].to_string());
                i = j;
            }
            b'[' => {
                let close = s[i..]
                    .find(']')
                    .map(|p| i + p)
                    .ok_or_else(|| DomError::BadSelector(input.to_string()))?;
                let inner = &s[i + 1..close];
                if let Some(eq) = inner.find('=') {
                    let name = inner[..eq].trim().to_string();
                    let value = inner[eq + 1..]
                        .trim()
                        .trim_matches(|c| c == '"' || c == '\'')
                        .to_string();
                    if name.is_empty() {
                        return Err(DomError::BadSelector(input.to_string()));
                    }
                    sel.attrs.push((name, Some(value)));
                } else {
                    let name = inner.trim().to_string();
                    if name.is_empty() {
                        return Err(DomError::BadSelector(input.to_string()));
                    }
                    sel.attrs.push((name, None));
                }
                i = close + 1;
            }
            _ => return Err(DomError::BadSelector(input.to_string())),
        }
    }

    Ok(sel)
}
