//! The host DOM seam.
//!
//! The tour controller never touches a concrete document; it speaks to a
//! [`Dom`] implementation. [`headless::HeadlessDom`] backs tests and
//! headless embedding, [`web::WebDom`] binds to a real browser document.

#[cfg(feature = "headless")]
pub mod headless;
#[cfg(feature = "web")]
pub mod web;

use crate::geometry::{Point, Rect, Size};

/// Opaque handle to a DOM node. Handles stay valid for the lifetime of the
/// backend even after the node is detached from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised by a DOM backend
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("markup did not produce an element: {0:?}")]
    EmptyMarkup(String),

    #[error("unsupported selector: {0:?}")]
    BadSelector(String),

    #[error("no browser window/document available")]
    NoDocument,
}

/// Document access as the tour needs it: queries, structural edits, class
/// and attribute toggling, layout geometry, and viewport state.
///
/// Selector support is backend-defined; the headless backend covers compound
/// simple selectors (`tag`, `#id`, `.class`, `[attr]`, `[attr="value"]`),
/// which is what the widget's own selectors use.
pub trait Dom {
    /// The page body.
    fn body(&self) -> NodeId;

    /// First match for `selector` in the document, depth-first.
    fn query(&self, selector: &str) -> Option<NodeId>;

    /// First match for `selector` among the descendants of `root`.
    fn query_within(&self, root: NodeId, selector: &str) -> Option<NodeId>;

    /// All matches for `selector` in the document, in document order.
    fn query_all(&self, selector: &str) -> Vec<NodeId>;

    /// Whether `node` itself matches `selector`.
    fn matches(&self, node: NodeId, selector: &str) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or a descendant of it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Build a detached element from an HTML fragment string. The fragment's
    /// first element becomes the node.
    fn create_from_markup(&mut self, markup: &str) -> Result<NodeId, DomError>;

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Insert `node` as the next sibling of `anchor`.
    fn insert_after(&mut self, anchor: NodeId, node: NodeId);

    /// Detach `node` (and its subtree) from the document.
    fn remove(&mut self, node: NodeId);

    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// Replace the node's content with a single text child.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Set an inline style property, e.g. `("top", "120px")`.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    /// Viewport-relative bounding rectangle.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Layout-top offset (`offsetTop`), used for `fixed` placement.
    fn offset_top(&self, node: NodeId) -> f64;

    /// Computed z-index, if the node has a numeric one.
    fn computed_z_index(&self, node: NodeId) -> Option<i32>;

    /// Viewport size in CSS pixels.
    fn viewport(&self) -> Size;

    /// Current page scroll offset.
    fn scroll_offset(&self) -> Point;

    /// Scroll the page to a vertical offset, keeping the horizontal one.
    fn set_scroll_top(&mut self, top: f64);
}
