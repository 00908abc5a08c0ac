//! Step placement.
//!
//! Filters the configured steps down to the ones visible at the current
//! breakpoint and inserts one positioned marker per visible step. Marker
//! positions are computed once; a later viewport resize does not move them.

use log::debug;

use crate::config::{Step, StepLocation, StepPosition, TourConfig, CLASS_TOUR_ACTIVE, STEP_ID_ATTR};
use crate::dom::{Dom, NodeId};
use crate::geometry;
use crate::screen::Breakpoint;
use crate::Error;

/// Stacking order forced onto `windowMiddle` markers, above any target.
const WINDOW_LAYER_Z_INDEX: i32 = 1000;

/// Result of placing a tour: the visible step list (step identity is the
/// index in here), one marker per step, and the page container that carries
/// the tour-active class.
#[derive(Debug)]
pub struct Placement {
    pub breakpoint: Breakpoint,
    pub steps: Vec<Step>,
    pub markers: Vec<NodeId>,
    pub container: NodeId,
}

/// Steps visible at `breakpoint`: no restriction, or a restriction that
/// names it. Relative order is preserved.
pub fn visible_steps(steps: &[Step], breakpoint: Breakpoint) -> Vec<Step> {
    steps
        .iter()
        .filter(|step| step.shown_at(breakpoint))
        .cloned()
        .collect()
}

/// Place all markers for `config`. Resolves every selector before the first
/// DOM mutation, so a bad configuration leaves the document untouched.
pub fn place_steps<D: Dom>(dom: &mut D, config: &TourConfig) -> Result<Placement, Error> {
    let breakpoint = Breakpoint::classify(dom.viewport().width, &config.breakpoints);
    let steps = visible_steps(&config.steps, breakpoint);
    if steps.is_empty() {
        return Err(Error::NoVisibleSteps(breakpoint));
    }
    debug!(
        "placing {} of {} steps at the {breakpoint} breakpoint",
        steps.len(),
        config.steps.len()
    );

    let container = match &config.page_container_selector {
        Some(selector) => dom.query(selector).ok_or_else(|| Error::SelectorUnmatched {
            selector: selector.clone(),
        })?,
        None => dom.body(),
    };
    let targets = steps
        .iter()
        .map(|step| resolve_target(dom, step))
        .collect::<Result<Vec<_>, _>>()?;

    dom.add_class(container, CLASS_TOUR_ACTIVE);

    let mut markers = Vec::with_capacity(steps.len());
    for (i, (step, &target)) in steps.iter().zip(&targets).enumerate() {
        let marker = dom.create_from_markup(&config.marker_html)?;
        dom.set_attr(marker, STEP_ID_ATTR, &i.to_string());
        position_marker(dom, marker, step, target);
        if step.position == StepPosition::Locked {
            dom.insert_after(target, marker);
        } else {
            let body = dom.body();
            dom.append_child(body, marker);
        }
        markers.push(marker);
    }

    Ok(Placement {
        breakpoint,
        steps,
        markers,
        container,
    })
}

fn resolve_target<D: Dom>(dom: &D, step: &Step) -> Result<NodeId, Error> {
    match &step.target {
        Some(selector) => dom.query(selector).ok_or_else(|| Error::SelectorUnmatched {
            selector: selector.clone(),
        }),
        None => Ok(dom.body()),
    }
}

fn position_marker<D: Dom>(dom: &mut D, marker: NodeId, step: &Step, target: NodeId) {
    let rect = dom.bounding_rect(target);
    let left = geometry::page_offset(dom, target).x;
    // fixed markers measure from layout top, everything else from page offset
    let top = if step.position == StepPosition::Fixed {
        dom.offset_top(target)
    } else {
        geometry::page_offset(dom, target).y
    };
    let bottom = top + rect.height;
    let middle = top + rect.height / 2.0;
    let center = left + rect.width / 2.0;

    match step.position {
        StepPosition::Locked => {
            dom.set_style(marker, "position", "absolute");
            dom.set_style(
                marker,
                "margin-top",
                &format!("{}px", step.locked_top.unwrap_or(0.0)),
            );
            dom.set_style(
                marker,
                "margin-left",
                &format!("{}px", step.locked_left.unwrap_or(0.0)),
            );
        }
        StepPosition::Fixed => dom.set_style(marker, "position", "fixed"),
        StepPosition::Absolute => dom.set_style(marker, "position", "absolute"),
    }

    let z_index = step
        .z_index
        .unwrap_or_else(|| geometry::stacking_order(dom, target));
    dom.set_style(marker, "z-index", &z_index.to_string());

    match step.location {
        StepLocation::BottomMiddle => {
            dom.set_style(marker, "left", &format!("{center}px"));
            dom.set_style(marker, "top", &format!("{bottom}px"));
        }
        StepLocation::CenterMiddle => {
            dom.set_style(marker, "left", &format!("{center}px"));
            dom.set_style(marker, "top", &format!("{middle}px"));
        }
        StepLocation::WindowMiddle => {
            let viewport = dom.viewport();
            dom.set_style(marker, "z-index", &WINDOW_LAYER_Z_INDEX.to_string());
            dom.set_style(marker, "left", &format!("{}px", viewport.width / 2.0));
            dom.set_style(marker, "top", &format!("{}px", viewport.height / 2.0));
        }
        // host-supplied CSS takes over
        StepLocation::Unset => {}
    }
}

#[cfg(test)]
#[cfg(feature = "headless")]
mod tests {
    use super::*;
    use crate::config::{TourConfig, TourOptions};
    use crate::dom::headless::HeadlessDom;
    use crate::geometry::Rect;

    fn step(target: Option<&str>) -> Step {
        Step {
            target: target.map(str::to_string),
            message: "step".to_string(),
            ..Step::default()
        }
    }

    fn restricted(target: Option<&str>, shown_on: &[Breakpoint]) -> Step {
        Step {
            shown_on: Some(shown_on.to_vec()),
            ..step(target)
        }
    }

    #[test]
    fn filter_keeps_order_and_unrestricted_steps() {
        let steps = vec![
            restricted(None, &[Breakpoint::Mobile]),
            step(None),
            restricted(None, &[Breakpoint::Desktop, Breakpoint::Tablet]),
        ];
        let visible = visible_steps(&steps, Breakpoint::Desktop);
        assert_eq!(visible.len(), 2);
        assert!(visible[0].shown_on.is_none());
        assert!(visible[1].shown_on.is_some());

        let visible = visible_steps(&steps, Breakpoint::Mobile);
        assert_eq!(visible.len(), 2);
        assert!(visible[0].shown_on.is_some());
    }

    #[test]
    fn bottom_middle_marker_position() {
        let mut dom = HeadlessDom::new();
        let target = dom
            .insert_markup(dom.body(), r#"<div id="hero"></div>"#)
            .unwrap();
        dom.set_layout(target, Rect::new(100.0, 200.0, 300.0, 80.0));

        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![Step {
                location: StepLocation::BottomMiddle,
                ..step(Some("#hero"))
            }]),
            ..TourOptions::default()
        });
        let placement = place_steps(&mut dom, &config).unwrap();
        let marker = placement.markers[0];
        assert_eq!(dom.style(marker, "position").as_deref(), Some("absolute"));
        assert_eq!(dom.style(marker, "left").as_deref(), Some("250px"));
        assert_eq!(dom.style(marker, "top").as_deref(), Some("280px"));
        // unstyled target sits at layer 0, marker one above
        assert_eq!(dom.style(marker, "z-index").as_deref(), Some("1"));
        assert_eq!(dom.attr(marker, STEP_ID_ATTR).as_deref(), Some("0"));
        assert!(dom.has_class(dom.body(), CLASS_TOUR_ACTIVE));
    }

    #[test]
    fn window_middle_ignores_target_geometry() {
        let mut dom = HeadlessDom::with_viewport(1000.0, 600.0);
        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![Step {
                location: StepLocation::WindowMiddle,
                ..step(None)
            }]),
            ..TourOptions::default()
        });
        let placement = place_steps(&mut dom, &config).unwrap();
        let marker = placement.markers[0];
        assert_eq!(dom.style(marker, "left").as_deref(), Some("500px"));
        assert_eq!(dom.style(marker, "top").as_deref(), Some("300px"));
        assert_eq!(dom.style(marker, "z-index").as_deref(), Some("1000"));
    }

    #[test]
    fn locked_marker_follows_target() {
        let mut dom = HeadlessDom::new();
        dom.insert_markup(dom.body(), r#"<div id="menu"></div>"#)
            .unwrap();
        dom.insert_markup(dom.body(), r#"<div id="rest"></div>"#)
            .unwrap();
        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![Step {
                position: StepPosition::Locked,
                locked_top: Some(12.0),
                locked_left: Some(-4.0),
                ..step(Some("#menu"))
            }]),
            ..TourOptions::default()
        });
        let placement = place_steps(&mut dom, &config).unwrap();
        let marker = placement.markers[0];
        assert_eq!(dom.style(marker, "position").as_deref(), Some("absolute"));
        assert_eq!(dom.style(marker, "margin-top").as_deref(), Some("12px"));
        assert_eq!(dom.style(marker, "margin-left").as_deref(), Some("-4px"));
        // inserted right after the target, ahead of the rest of the page
        let menu = dom.query("#menu").unwrap();
        assert_eq!(dom.parent(marker), dom.parent(menu));
    }

    #[test]
    fn step_z_index_override_wins() {
        let mut dom = HeadlessDom::new();
        let target = dom
            .insert_markup(dom.body(), r#"<div id="hero"></div>"#)
            .unwrap();
        dom.set_z_index(target, 40);
        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![
                Step {
                    z_index: Some(7),
                    ..step(Some("#hero"))
                },
                step(Some("#hero")),
            ]),
            ..TourOptions::default()
        });
        let placement = place_steps(&mut dom, &config).unwrap();
        assert_eq!(
            dom.style(placement.markers[0], "z-index").as_deref(),
            Some("7")
        );
        assert_eq!(
            dom.style(placement.markers[1], "z-index").as_deref(),
            Some("41")
        );
    }

    #[test]
    fn zero_visible_steps_is_an_error_without_mutation() {
        let mut dom = HeadlessDom::with_viewport(320.0, 600.0);
        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![restricted(None, &[Breakpoint::Desktop])]),
            ..TourOptions::default()
        });
        let before = dom.attached_element_count();
        let err = place_steps(&mut dom, &config).unwrap_err();
        assert!(matches!(err, Error::NoVisibleSteps(Breakpoint::Mobile)));
        assert_eq!(dom.attached_element_count(), before);
        assert!(!dom.has_class(dom.body(), CLASS_TOUR_ACTIVE));
    }

    #[test]
    fn unmatched_target_selector_is_an_error_without_mutation() {
        let mut dom = HeadlessDom::new();
        let config = TourConfig::resolve(TourOptions {
            steps: Some(vec![step(None), step(Some("#missing"))]),
            ..TourOptions::default()
        });
        let before = dom.attached_element_count();
        let err = place_steps(&mut dom, &config).unwrap_err();
        match err {
            Error::SelectorUnmatched { selector } => assert_eq!(selector, "#missing"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dom.attached_element_count(), before);
    }
}
