//! Screen-size classification.
//!
//! Maps the current viewport width to one of three named breakpoints using
//! two configured thresholds. Pure and deterministic; the tour evaluates it
//! exactly once, at initialization.

use std::fmt;

use serde::Deserialize;

/// Width thresholds separating the breakpoints, in CSS pixels.
/// `mobile` must be strictly below `tablet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BreakpointThresholds {
    pub mobile: u32,
    pub tablet: u32,
}

impl Default for BreakpointThresholds {
    fn default() -> Self {
        Self {
            mobile: 640,
            tablet: 1024,
        }
    }
}

/// Named screen-size classes a step can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    /// Classify a viewport width against the configured thresholds:
    /// `mobile` below the mobile threshold, `tablet` up to (excluding) the
    /// tablet threshold, `desktop` otherwise.
    pub fn classify(width: f64, thresholds: &BreakpointThresholds) -> Self {
        if width < f64::from(thresholds.mobile) {
            Breakpoint::Mobile
        } else if width < f64::from(thresholds.tablet) {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let t = BreakpointThresholds::default();
        assert_eq!(t.mobile, 640);
        assert_eq!(t.tablet, 1024);
    }

    #[test]
    fn classification_boundaries() {
        let t = BreakpointThresholds::default();
        assert_eq!(Breakpoint::classify(0.0, &t), Breakpoint::Mobile);
        assert_eq!(Breakpoint::classify(639.0, &t), Breakpoint::Mobile);
        assert_eq!(Breakpoint::classify(640.0, &t), Breakpoint::Tablet);
        assert_eq!(Breakpoint::classify(1023.0, &t), Breakpoint::Tablet);
        assert_eq!(Breakpoint::classify(1024.0, &t), Breakpoint::Desktop);
        assert_eq!(Breakpoint::classify(2560.0, &t), Breakpoint::Desktop);
    }

    #[test]
    fn custom_thresholds() {
        let t = BreakpointThresholds {
            mobile: 400,
            tablet: 800,
        };
        assert_eq!(Breakpoint::classify(399.9, &t), Breakpoint::Mobile);
        assert_eq!(Breakpoint::classify(400.0, &t), Breakpoint::Tablet);
        assert_eq!(Breakpoint::classify(800.0, &t), Breakpoint::Desktop);
    }

    #[test]
    fn deserializes_lowercase_names() {
        let parsed: Vec<Breakpoint> =
            serde_json::from_str(r#"["mobile", "tablet", "desktop"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop]
        );
    }
}
