// Core module of the Chaperone tour widget
pub mod config;
pub mod dom;
pub mod events;
pub mod geometry;
pub mod placement;
pub mod screen;
pub mod tour;

/// Version of the Chaperone widget
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::config::{Callback, Step, StepLocation, StepPosition, TourOptions};
    #[cfg(feature = "headless")]
    pub use crate::dom::headless::HeadlessDom;
    #[cfg(feature = "web")]
    pub use crate::dom::web::WebDom;
    pub use crate::dom::{Dom, DomError, NodeId};
    pub use crate::screen::{Breakpoint, BreakpointThresholds};
    pub use crate::tour::{Phase, TimerId, TimerRequest, Tour};
    pub use crate::Error;
}

/// Errors that can occur while running a tour
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("DOM error: {0}")]
    Dom(#[from] dom::DomError),

    #[error("selector {selector:?} did not match any element")]
    SelectorUnmatched { selector: String },

    #[error("step {0} is outside the visible step list")]
    InvalidStep(usize),

    #[error("no step is visible at the {0} breakpoint")]
    NoVisibleSteps(crate::screen::Breakpoint),

    #[error("the tour has already ended")]
    TourEnded,
}
