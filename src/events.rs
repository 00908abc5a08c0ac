//! Click-target resolution.
//!
//! The tour registers one document-wide click handler. Instead of sniffing
//! class names off the clicked element, the controller keeps a typed lookup
//! (the marker list plus the live panel's control handles) and resolves the
//! click by walking ancestors until one of those nodes is hit.

use crate::dom::{Dom, NodeId};

/// Handles into the live panel, captured when it is built.
#[derive(Debug, Clone)]
pub struct PanelRefs {
    pub root: NodeId,
    pub title: NodeId,
    pub progress: NodeId,
    pub text: NodeId,
    pub back: NodeId,
    pub next: NodeId,
    pub finish: NodeId,
    pub close: NodeId,
    /// Step the back control navigates to; `None` on the first step.
    pub back_step: Option<usize>,
    /// Step the next control navigates to; `None` on the last step unless
    /// the tour cycles.
    pub next_step: Option<usize>,
}

/// What a document click resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// A marker (or one of its descendants) for the given visible step.
    Marker(usize),
    Back,
    Next,
    Finish,
    Close,
    /// Inside the panel but not on a control.
    Panel,
    /// Anywhere else on the page.
    Outside,
}

/// Resolve a clicked node against the marker registry and the live panel.
/// Controls win over the panel root so a click on a button never counts as
/// a plain panel click.
pub fn resolve_click<D: Dom + ?Sized>(
    dom: &D,
    markers: &[NodeId],
    panel: Option<&PanelRefs>,
    clicked: NodeId,
) -> ClickTarget {
    let mut node = Some(clicked);
    while let Some(current) = node {
        if let Some(step) = markers.iter().position(|&m| m == current) {
            return ClickTarget::Marker(step);
        }
        if let Some(panel) = panel {
            if current == panel.back {
                return ClickTarget::Back;
            }
            if current == panel.next {
                return ClickTarget::Next;
            }
            if current == panel.finish {
                return ClickTarget::Finish;
            }
            if current == panel.close {
                return ClickTarget::Close;
            }
            if current == panel.root {
                return ClickTarget::Panel;
            }
        }
        node = dom.parent(current);
    }
    ClickTarget::Outside
}

#[cfg(test)]
#[cfg(feature = "headless")]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PANEL_HTML;
    use crate::dom::headless::HeadlessDom;

    fn panel_refs(dom: &mut HeadlessDom) -> PanelRefs {
        let root = dom.insert_markup(dom.body(), DEFAULT_PANEL_HTML).unwrap();
        PanelRefs {
            root,
            title: dom
                .query_within(root, r#"[data-hook="chaperone-title"]"#)
                .unwrap(),
            progress: dom
                .query_within(root, r#"[data-hook="chaperone-progress"]"#)
                .unwrap(),
            text: dom
                .query_within(root, r#"[data-hook="chaperone-text"]"#)
                .unwrap(),
            back: dom
                .query_within(root, r#"[data-hook="chaperone-back"]"#)
                .unwrap(),
            next: dom
                .query_within(root, r#"[data-hook="chaperone-next"]"#)
                .unwrap(),
            finish: dom
                .query_within(root, r#"[data-hook="chaperone-finish"]"#)
                .unwrap(),
            close: dom
                .query_within(root, r#"[data-hook="close-chaperone"]"#)
                .unwrap(),
            back_step: None,
            next_step: Some(1),
        }
    }

    #[test]
    fn marker_descendant_resolves_to_marker() {
        let mut dom = HeadlessDom::new();
        let marker = dom
            .insert_markup(
                dom.body(),
                r#"<span class="throbber"><span class="dot"></span></span>"#,
            )
            .unwrap();
        let dot = dom.query(".dot").unwrap();
        let target = resolve_click(&dom, &[marker], None, dot);
        assert_eq!(target, ClickTarget::Marker(0));
    }

    #[test]
    fn panel_controls_win_over_panel_root() {
        let mut dom = HeadlessDom::new();
        let refs = panel_refs(&mut dom);
        assert_eq!(
            resolve_click(&dom, &[], Some(&refs), refs.next),
            ClickTarget::Next
        );
        // the close control's inner icon resolves through its ancestor
        let icon = dom.query(".close").unwrap();
        assert_eq!(
            resolve_click(&dom, &[], Some(&refs), icon),
            ClickTarget::Close
        );
        assert_eq!(
            resolve_click(&dom, &[], Some(&refs), refs.text),
            ClickTarget::Panel
        );
    }

    #[test]
    fn unrelated_node_is_outside() {
        let mut dom = HeadlessDom::new();
        let stray = dom.insert_markup(dom.body(), "<div></div>").unwrap();
        assert_eq!(
            resolve_click(&dom, &[], None, stray),
            ClickTarget::Outside
        );
    }
}
