//! Tour configuration.
//!
//! Callers supply a partial [`TourOptions`] (deserializable from the same
//! JSON shape the original widget consumed); [`TourConfig::resolve`] overlays
//! it on the built-in defaults, one nested level deep, and validation runs
//! once at tour construction.

use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::screen::{Breakpoint, BreakpointThresholds};

/// Class toggled on markers and the panel while they are shown.
pub const CLASS_ACTIVE: &str = "active";
/// Class marking the page container while a tour is placed.
pub const CLASS_TOUR_ACTIVE: &str = "chaperone-active";
/// Class hiding the finish control until the last step.
pub const CLASS_HIDE: &str = "hide";
/// Class disabling the back control on the first step.
pub const CLASS_DISABLED: &str = "chaperone-disabled";
/// Class marking the panel while it shows the resize notice.
pub const CLASS_MESSAGE: &str = "message";

/// Attribute carrying a marker's (and nav control's) visible step index.
pub const STEP_ID_ATTR: &str = "data-stepid";

pub(crate) const DEFAULT_MARKER_HTML: &str =
    r#"<span class="throbber"><span class="dot"></span></span>"#;

pub(crate) const DEFAULT_PANEL_HTML: &str = concat!(
    r#"<div class="chaperone">"#,
    r#"<div class="chaperone__header">"#,
    r#"<div class="chaperone__title" data-hook="chaperone-title"></div>"#,
    r#"<div class="chaperone__progress" data-hook="chaperone-progress">X of X</div>"#,
    r#"</div>"#,
    r#"<div class="chaperone__body" data-hook="chaperone-text"></div>"#,
    r#"<div class="chaperone__controls"><div class="chaperone__controls__wrapper">"#,
    r#"<a class="close-chaperone" data-hook="close-chaperone"><span class="close thick"></span></a>"#,
    r#"<a class="chaperone-btn" data-hook="chaperone-back">Back</a>"#,
    r#"<a class="chaperone-btn chaperone-btn--next" data-hook="chaperone-next">Next</a>"#,
    r#"<a class="chaperone-btn chaperone-btn--finish hide" data-hook="chaperone-finish">Finish</a>"#,
    r#"</div></div></div>"#
);

/// A host-supplied hook with no arguments and no consumed return value.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn()>);

impl Callback {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self) {
        (self.0)();
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// How a step's marker is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPosition {
    /// Positioned in page coordinates. Unrecognized position strings fall
    /// back here.
    #[default]
    Absolute,
    /// Positioned in viewport coordinates; the page is not scrolled to it.
    Fixed,
    /// Inserted directly after the target with explicit pixel margins.
    Locked,
}

impl<'de> Deserialize<'de> for StepPosition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "fixed" => StepPosition::Fixed,
            "locked" => StepPosition::Locked,
            _ => StepPosition::Absolute,
        })
    }
}

/// Named location of a marker relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepLocation {
    /// No positioning applied; the host stylesheet takes over.
    #[default]
    Unset,
    /// Horizontal center of the target, at its bottom edge.
    BottomMiddle,
    /// Horizontal center of the target, at its vertical middle.
    CenterMiddle,
    /// Center of the viewport, ignoring target geometry.
    WindowMiddle,
}

impl<'de> Deserialize<'de> for StepLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "bottomMiddle" => StepLocation::BottomMiddle,
            "centerMiddle" => StepLocation::CenterMiddle,
            "windowMiddle" => StepLocation::WindowMiddle,
            _ => StepLocation::Unset,
        })
    }
}

/// One entry in the tour. Immutable once supplied; identity is the index in
/// the filtered visible list, never the index in the configured list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Step {
    /// Target selector; absence targets the page body.
    pub target: Option<String>,
    pub position: StepPosition,
    pub location: StepLocation,
    /// Top margin in pixels, `locked` position only.
    pub locked_top: Option<f64>,
    /// Left margin in pixels, `locked` position only.
    pub locked_left: Option<f64>,
    /// Stacking-order override; defaults to one above the target.
    pub z_index: Option<i32>,
    pub title: Option<String>,
    pub message: String,
    /// Breakpoints the step is shown on; absence means all of them.
    pub shown_on: Option<Vec<Breakpoint>>,
    #[serde(skip)]
    pub on_open: Option<Callback>,
    #[serde(skip)]
    pub on_close: Option<Callback>,
}

impl Step {
    /// Whether the step is visible at `breakpoint`.
    pub fn shown_at(&self, breakpoint: Breakpoint) -> bool {
        match &self.shown_on {
            Some(restriction) => restriction.contains(&breakpoint),
            None => true,
        }
    }
}

/// Selectors locating the panel's sub-elements once the panel markup has
/// been inserted. Each must resolve to exactly one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSelectors {
    pub title: String,
    pub progress: String,
    pub text: String,
    pub back: String,
    pub next: String,
    pub finish: String,
    pub close: String,
}

impl Default for PanelSelectors {
    fn default() -> Self {
        Self {
            title: r#"[data-hook="chaperone-title"]"#.to_string(),
            progress: r#"[data-hook="chaperone-progress"]"#.to_string(),
            text: r#"[data-hook="chaperone-text"]"#.to_string(),
            back: r#"[data-hook="chaperone-back"]"#.to_string(),
            next: r#"[data-hook="chaperone-next"]"#.to_string(),
            finish: r#"[data-hook="chaperone-finish"]"#.to_string(),
            close: r#"[data-hook="close-chaperone"]"#.to_string(),
        }
    }
}

/// Partial threshold override, merged field by field.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct BreakpointOverrides {
    pub mobile: Option<u32>,
    pub tablet: Option<u32>,
}

/// Caller-supplied partial configuration. Field names and nesting follow the
/// original widget's JSON shape, so existing tour fixtures deserialize as-is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TourOptions {
    pub breakpoints: Option<BreakpointOverrides>,
    #[serde(rename = "throbberHTML")]
    pub marker_html: Option<String>,
    #[serde(rename = "chaperoneHTML")]
    pub panel_html: Option<String>,
    pub page_container_selector: Option<String>,
    pub title_selector: Option<String>,
    pub progress_selector: Option<String>,
    pub text_selector: Option<String>,
    pub back_selector: Option<String>,
    pub next_selector: Option<String>,
    pub finish_selector: Option<String>,
    pub close_selector: Option<String>,
    /// Animation duration in milliseconds.
    pub animation_time: Option<u64>,
    pub cycle: Option<bool>,
    pub auto_start: Option<bool>,
    pub steps: Option<Vec<Step>>,
    #[serde(skip)]
    pub finish_callback: Option<Callback>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct TourConfig {
    pub breakpoints: BreakpointThresholds,
    pub marker_html: String,
    pub panel_html: String,
    /// Element marked `chaperone-active` while the tour is placed; the page
    /// body when absent.
    pub page_container_selector: Option<String>,
    pub selectors: PanelSelectors,
    pub animation_ms: u64,
    pub cycle: bool,
    pub auto_start: bool,
    pub steps: Vec<Step>,
    pub finish_callback: Option<Callback>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            breakpoints: BreakpointThresholds::default(),
            marker_html: DEFAULT_MARKER_HTML.to_string(),
            panel_html: DEFAULT_PANEL_HTML.to_string(),
            page_container_selector: None,
            selectors: PanelSelectors::default(),
            animation_ms: 300,
            cycle: false,
            auto_start: true,
            steps: vec![Step {
                position: StepPosition::Fixed,
                location: StepLocation::WindowMiddle,
                title: Some("Welcome to Chaperone.".to_string()),
                message: "Add some more steps already!".to_string(),
                ..Step::default()
            }],
            finish_callback: None,
        }
    }
}

impl TourConfig {
    /// Overlay caller options on the defaults. Top-level fields replace
    /// wholesale; breakpoint thresholds merge one level deep.
    pub fn resolve(options: TourOptions) -> Self {
        let mut config = TourConfig::default();

        if let Some(bp) = options.breakpoints {
            if let Some(mobile) = bp.mobile {
                config.breakpoints.mobile = mobile;
            }
            if let Some(tablet) = bp.tablet {
                config.breakpoints.tablet = tablet;
            }
        }
        if let Some(html) = options.marker_html {
            config.marker_html = html;
        }
        if let Some(html) = options.panel_html {
            config.panel_html = html;
        }
        if let Some(selector) = options.page_container_selector {
            if !selector.is_empty() {
                config.page_container_selector = Some(selector);
            }
        }
        if let Some(s) = options.title_selector {
            config.selectors.title = s;
        }
        if let Some(s) = options.progress_selector {
            config.selectors.progress = s;
        }
        if let Some(s) = options.text_selector {
            config.selectors.text = s;
        }
        if let Some(s) = options.back_selector {
            config.selectors.back = s;
        }
        if let Some(s) = options.next_selector {
            config.selectors.next = s;
        }
        if let Some(s) = options.finish_selector {
            config.selectors.finish = s;
        }
        if let Some(s) = options.close_selector {
            config.selectors.close = s;
        }
        if let Some(ms) = options.animation_time {
            config.animation_ms = ms;
        }
        if let Some(cycle) = options.cycle {
            config.cycle = cycle;
        }
        if let Some(auto_start) = options.auto_start {
            config.auto_start = auto_start;
        }
        if let Some(steps) = options.steps {
            config.steps = steps;
        }
        config.finish_callback = options.finish_callback;

        config
    }

    /// Validate the resolved configuration. Runs once, before any DOM
    /// mutation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breakpoints.mobile >= self.breakpoints.tablet {
            return Err(ConfigError::InvalidBreakpoints {
                mobile: self.breakpoints.mobile,
                tablet: self.breakpoints.tablet,
            });
        }
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        Ok(())
    }
}

/// Errors raised while resolving or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("mobile breakpoint ({mobile}) must be below the tablet breakpoint ({tablet})")]
    InvalidBreakpoints { mobile: u32, tablet: u32 },

    #[error("a tour needs at least one step")]
    NoSteps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtins() {
        let config = TourConfig::default();
        assert_eq!(config.breakpoints.mobile, 640);
        assert_eq!(config.breakpoints.tablet, 1024);
        assert_eq!(config.animation_ms, 300);
        assert!(config.auto_start);
        assert!(!config.cycle);
        assert_eq!(config.steps.len(), 1);
        assert_eq!(config.steps[0].location, StepLocation::WindowMiddle);
    }

    #[test]
    fn overlay_keeps_unspecified_defaults() {
        let options = TourOptions {
            animation_time: Some(50),
            steps: Some(vec![Step {
                message: "first".to_string(),
                ..Step::default()
            }]),
            ..TourOptions::default()
        };
        let config = TourConfig::resolve(options);
        assert_eq!(config.animation_ms, 50);
        assert_eq!(config.steps.len(), 1);
        assert_eq!(config.breakpoints.tablet, 1024);
        assert_eq!(config.selectors, PanelSelectors::default());
    }

    #[test]
    fn breakpoints_merge_one_level_deep() {
        let options = TourOptions {
            breakpoints: Some(BreakpointOverrides {
                mobile: Some(480),
                tablet: None,
            }),
            ..TourOptions::default()
        };
        let config = TourConfig::resolve(options);
        assert_eq!(config.breakpoints.mobile, 480);
        assert_eq!(config.breakpoints.tablet, 1024);
    }

    #[test]
    fn deserializes_original_json_shape() {
        let json = r##"{
            "breakpoints": { "mobile": 500 },
            "throbberHTML": "<span class=\"throbber\"></span>",
            "animationTime": 120,
            "autoStart": false,
            "steps": [
                {
                    "target": "#menu",
                    "position": "locked",
                    "location": "bottomMiddle",
                    "lockedTop": 12,
                    "lockedLeft": -4,
                    "zIndex": 50,
                    "title": "Menu",
                    "message": "Open the menu here.",
                    "shownOn": ["tablet", "desktop"]
                }
            ]
        }"##;
        let options: TourOptions = serde_json::from_str(json).unwrap();
        let config = TourConfig::resolve(options);
        assert_eq!(config.breakpoints.mobile, 500);
        assert_eq!(config.animation_ms, 120);
        assert!(!config.auto_start);

        let step = &config.steps[0];
        assert_eq!(step.target.as_deref(), Some("#menu"));
        assert_eq!(step.position, StepPosition::Locked);
        assert_eq!(step.location, StepLocation::BottomMiddle);
        assert_eq!(step.locked_top, Some(12.0));
        assert_eq!(step.locked_left, Some(-4.0));
        assert_eq!(step.z_index, Some(50));
        assert!(!step.shown_at(Breakpoint::Mobile));
        assert!(step.shown_at(Breakpoint::Desktop));
    }

    #[test]
    fn unknown_position_and_location_fall_back() {
        let json = r#"{ "position": "floating", "location": "nowhere", "message": "m" }"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.position, StepPosition::Absolute);
        assert_eq!(step.location, StepLocation::Unset);
    }

    #[test]
    fn validation_rejects_inverted_breakpoints() {
        let mut config = TourConfig::default();
        config.breakpoints = BreakpointThresholds {
            mobile: 1200,
            tablet: 800,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBreakpoints { .. })
        ));
    }

    #[test]
    fn validation_rejects_empty_steps() {
        let mut config = TourConfig::default();
        config.steps.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoSteps)));
    }
}
