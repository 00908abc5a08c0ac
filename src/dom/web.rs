//! Browser DOM backend over `web-sys`, plus the glue that wires a tour to
//! the live document: one delegated click listener, a resize listener, and
//! `setTimeout`-backed timer requests.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::config::TourOptions;
use crate::dom::{Dom, DomError, NodeId};
use crate::geometry::{Point, Rect, Size};
use crate::tour::Tour;
use crate::Error;

/// DOM backend bound to the browser document. Node handles are interned
/// `web_sys::Element` references, so identity comparisons in the click
/// routing work the same as in the headless backend.
pub struct WebDom {
    window: Window,
    document: Document,
    body: NodeId,
    nodes: RefCell<Vec<Element>>,
}

impl WebDom {
    pub fn new() -> Result<Self, DomError> {
        let window = web_sys::window().ok_or(DomError::NoDocument)?;
        let document = window.document().ok_or(DomError::NoDocument)?;
        let body: Element = document.body().ok_or(DomError::NoDocument)?.into();
        let dom = Self {
            window,
            document,
            body: NodeId(0),
            nodes: RefCell::new(vec![body]),
        };
        Ok(dom)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Map an element to a stable [`NodeId`], reusing the id of an element
    /// seen before.
    pub fn intern(&self, element: Element) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(position) = nodes.iter().position(|n| n == &element) {
            return NodeId(position as u32);
        }
        nodes.push(element);
        NodeId((nodes.len() - 1) as u32)
    }

    fn el(&self, node: NodeId) -> Element {
        self.nodes.borrow()[node.index()].clone()
    }
}

impl Dom for WebDom {
    fn body(&self) -> NodeId {
        self.body
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        let element = self.document.query_selector(selector).ok().flatten()?;
        Some(self.intern(element))
    }

    fn query_within(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let element = self.el(root).query_selector(selector).ok().flatten()?;
        Some(self.intern(element))
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        let Ok(list) = self.document.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.intern(element))
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.el(node).matches(selector).unwrap_or(false)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.el(node).parent_element()?;
        Some(self.intern(parent))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let child = self.el(node);
        self.el(ancestor).contains(Some(child.as_ref()))
    }

    fn create_from_markup(&mut self, markup: &str) -> Result<NodeId, DomError> {
        let wrapper = self
            .document
            .create_element("div")
            .map_err(|_| DomError::EmptyMarkup(markup.to_string()))?;
        wrapper.set_inner_html(markup);
        let first = wrapper
            .first_element_child()
            .ok_or_else(|| DomError::EmptyMarkup(markup.to_string()))?;
        Ok(self.intern(first))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let child = self.el(child);
        let _ = self.el(parent).append_child(child.as_ref());
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let element = self.el(node);
        let _ = self.el(anchor).insert_adjacent_element("afterend", &element);
    }

    fn remove(&mut self, node: NodeId) {
        self.el(node).remove();
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let _ = self.el(node).class_list().add_1(class);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let _ = self.el(node).class_list().remove_1(class);
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.el(node).class_list().contains(class)
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let _ = self.el(node).set_attribute(name, value);
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.el(node).get_attribute(name)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.el(node).set_text_content(Some(text));
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(html) = self.el(node).dyn_ref::<HtmlElement>() {
            let _ = html.style().set_property(property, value);
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let rect = self.el(node).get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        self.el(node)
            .dyn_ref::<HtmlElement>()
            .map_or(0.0, |html| f64::from(html.offset_top()))
    }

    fn computed_z_index(&self, node: NodeId) -> Option<i32> {
        let element = self.el(node);
        let style = self.window.get_computed_style(&element).ok().flatten()?;
        style
            .get_property_value("z-index")
            .ok()
            .and_then(|value| value.parse().ok())
    }

    fn viewport(&self) -> Size {
        let width = self
            .window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Size::new(width, height)
    }

    fn scroll_offset(&self) -> Point {
        Point::new(
            self.window.page_x_offset().unwrap_or(0.0),
            self.window.page_y_offset().unwrap_or(0.0),
        )
    }

    fn set_scroll_top(&mut self, top: f64) {
        let x = self.scroll_offset().x;
        self.window.scroll_to_with_x_and_y(x, top);
    }
}

/// A tour mounted on the live document. Keeps the event-listener closures
/// alive for as long as the handle exists.
pub struct WebTour {
    tour: Rc<RefCell<Tour<WebDom>>>,
    _on_click: Closure<dyn FnMut(web_sys::MouseEvent)>,
    _on_resize: Closure<dyn FnMut()>,
}

impl WebTour {
    /// Place the tour on the current document and attach the delegated
    /// click and resize listeners.
    pub fn init(options: TourOptions) -> Result<Self, Error> {
        let dom = WebDom::new().map_err(Error::from)?;
        let document = dom.document().clone();
        let window = dom.window().clone();
        let tour = Rc::new(RefCell::new(Tour::init(dom, options)?));
        pump(&tour);

        let on_click = {
            let tour = Rc::clone(&tour);
            Closure::wrap(Box::new(move |event: web_sys::MouseEvent| {
                let Some(target) = event.target() else {
                    return;
                };
                let Ok(element) = target.dyn_into::<Element>() else {
                    return;
                };
                let node = tour.borrow().dom().intern(element);
                if let Err(err) = tour.borrow_mut().handle_click(node) {
                    log::warn!("click handling failed: {err}");
                }
                pump(&tour);
            }) as Box<dyn FnMut(web_sys::MouseEvent)>)
        };
        let _ = document
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());

        let on_resize = {
            let tour = Rc::clone(&tour);
            Closure::wrap(Box::new(move || {
                tour.borrow_mut().handle_resize();
            }) as Box<dyn FnMut()>)
        };
        let _ = window
            .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref());

        Ok(Self {
            tour,
            _on_click: on_click,
            _on_resize: on_resize,
        })
    }

    /// Shared handle to the underlying controller.
    pub fn tour(&self) -> Rc<RefCell<Tour<WebDom>>> {
        Rc::clone(&self.tour)
    }

    pub fn open(&self, step: usize) -> Result<(), Error> {
        let result = self.tour.borrow_mut().open(step);
        pump(&self.tour);
        result
    }

    pub fn close(&self) -> Result<(), Error> {
        let result = self.tour.borrow_mut().close();
        pump(&self.tour);
        result
    }

    pub fn finish(&self) -> Result<(), Error> {
        let result = self.tour.borrow_mut().finish();
        pump(&self.tour);
        result
    }
}

/// Arm a `setTimeout` for every pending timer request. Each fired timer can
/// schedule more, so the fire callback pumps again.
fn pump(tour: &Rc<RefCell<Tour<WebDom>>>) {
    let requests = tour.borrow_mut().take_timer_requests();
    if requests.is_empty() {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    for request in requests {
        let tour = Rc::clone(tour);
        let callback = Closure::once_into_js(move || {
            if let Err(err) = tour.borrow_mut().timer_fired(request.id) {
                log::warn!("timer handling failed: {err}");
            }
            pump(&tour);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            request.delay_ms as i32,
        );
    }
}
