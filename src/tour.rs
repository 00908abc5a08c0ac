//! The tour controller.
//!
//! Owns the session state (visible steps, markers, the live panel, the
//! current step) and drives open/close/finish transitions off a single
//! click-resolution entry point.
//!
//! Timing is host-driven: the controller never sleeps. When a transition
//! needs a delay it registers a pending action and surfaces a
//! [`TimerRequest`]; the host arms a real timer and calls
//! [`Tour::timer_fired`] when it elapses. Every navigation bumps a
//! generation counter, and pending opens and scroll ticks carry the
//! generation they were scheduled under; a stale one is discarded when it
//! fires. Panel-removal timers are exempt so a superseded panel still gets
//! removed.

use log::debug;

use crate::config::{
    Step, StepPosition, TourConfig, TourOptions, CLASS_ACTIVE, CLASS_DISABLED, CLASS_HIDE,
    CLASS_MESSAGE, CLASS_TOUR_ACTIVE, STEP_ID_ATTR,
};
use crate::dom::{Dom, NodeId};
use crate::events::{self, ClickTarget, PanelRefs};
use crate::geometry;
use crate::placement;
use crate::Error;

/// Pixels above the target the page scrolls to when opening a step.
const SCROLL_MARGIN_PX: f64 = 150.0;

/// Interval between smooth-scroll increments.
const SCROLL_TICK_MS: u64 = 10;

/// Text shown in the panel when the viewport is resized mid-tour. Marker
/// positions are computed once at placement, so a resize invalidates them.
const RESIZE_NOTICE: &str = "Your window has been resized. The tour is variable based on your \
     screen size, please refresh your browser then, if necessary, restart the tour.";

/// Handle for one pending host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A delay the host should arm; call [`Tour::timer_fired`] when it elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub id: TimerId,
    pub delay_ms: u64,
}

#[derive(Debug)]
enum Deferred {
    OpenStep { step: usize, generation: u64 },
    RemovePanel { panel: NodeId },
    ScrollTick { target: f64, remaining_ms: u64, generation: u64 },
}

/// Lifecycle phase of a tour session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Markers placed, no panel open.
    Placed,
    /// A panel is open.
    Open,
    /// The tour has finished; markers are gone.
    Ended,
}

/// A placed tour session. One instance per tour; no global state, so
/// several tours can coexist on one page against separate containers.
pub struct Tour<D: Dom> {
    dom: D,
    config: TourConfig,
    steps: Vec<Step>,
    markers: Vec<NodeId>,
    container: NodeId,
    panel: Option<PanelRefs>,
    /// 0-based index into the visible step list.
    current: Option<usize>,
    phase: Phase,
    generation: u64,
    pending: Vec<(TimerId, Deferred)>,
    requests: Vec<TimerRequest>,
    next_timer: u64,
}

impl<D: Dom> Tour<D> {
    /// Resolve and validate the configuration, place all markers, and
    /// (with auto-start on) open the first step. Fails before any DOM
    /// mutation on configuration errors.
    pub fn init(mut dom: D, options: TourOptions) -> Result<Self, Error> {
        let config = TourConfig::resolve(options);
        config.validate()?;

        let placed = placement::place_steps(&mut dom, &config)?;
        debug!("tour placed with {} visible steps", placed.steps.len());

        let mut tour = Self {
            dom,
            config,
            steps: placed.steps,
            markers: placed.markers,
            container: placed.container,
            panel: None,
            current: None,
            phase: Phase::Placed,
            generation: 0,
            pending: Vec::new(),
            requests: Vec::new(),
            next_timer: 0,
        };
        if tour.config.auto_start {
            tour.open(0)?;
        }
        Ok(tour)
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Currently open step, 1-based, as shown in the progress text.
    pub fn current_step(&self) -> Option<usize> {
        self.current.map(|i| i + 1)
    }

    /// Number of steps visible at the breakpoint the tour was placed at.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn markers(&self) -> &[NodeId] {
        &self.markers
    }

    /// Timers the host should arm. Drain after every call into the tour.
    pub fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Route a document click. The single entry point for all interaction
    /// once the tour is placed.
    pub fn handle_click(&mut self, clicked: NodeId) -> Result<(), Error> {
        if self.phase == Phase::Ended {
            return Ok(());
        }
        let target = events::resolve_click(&self.dom, &self.markers, self.panel.as_ref(), clicked);
        debug!("click resolved to {target:?}");
        match target {
            ClickTarget::Marker(step) => self.navigate(step),
            ClickTarget::Back => match self.panel.as_ref().and_then(|p| p.back_step) {
                Some(step) => self.navigate(step),
                None => Ok(()),
            },
            ClickTarget::Next => match self.panel.as_ref().and_then(|p| p.next_step) {
                Some(step) => self.navigate(step),
                None => Ok(()),
            },
            ClickTarget::Finish | ClickTarget::Close => self.finish(),
            ClickTarget::Panel | ClickTarget::Outside => Ok(()),
        }
    }

    /// Fire a previously requested timer. Unknown ids (already fired or
    /// never issued) are ignored.
    pub fn timer_fired(&mut self, id: TimerId) -> Result<(), Error> {
        let Some(position) = self.pending.iter().position(|(t, _)| *t == id) else {
            return Ok(());
        };
        let (_, action) = self.pending.remove(position);
        match action {
            Deferred::OpenStep { step, generation } => {
                if generation != self.generation || self.phase == Phase::Ended {
                    debug!("discarding stale open of step {step}");
                    return Ok(());
                }
                self.open(step)
            }
            Deferred::RemovePanel { panel } => {
                self.dom.remove(panel);
                Ok(())
            }
            Deferred::ScrollTick {
                target,
                remaining_ms,
                generation,
            } => {
                if generation != self.generation || self.phase == Phase::Ended {
                    return Ok(());
                }
                self.scroll_tick(target, remaining_ms);
                Ok(())
            }
        }
    }

    /// Open a step by its visible-list index (0-based).
    pub fn open(&mut self, step: usize) -> Result<(), Error> {
        if self.phase == Phase::Ended {
            return Err(Error::TourEnded);
        }
        let definition = self
            .steps
            .get(step)
            .cloned()
            .ok_or(Error::InvalidStep(step))?;

        // at most one panel is ever open; a direct open while another step
        // is showing closes it first, like the marker click path does
        if self.current.is_some() {
            self.close()?;
        }

        // fixed steps stay where they are; everything else scrolls the page
        // up to just above the target
        if definition.position != StepPosition::Fixed {
            if let Some(selector) = &definition.target {
                let target = self
                    .dom
                    .query(selector)
                    .ok_or_else(|| Error::SelectorUnmatched {
                        selector: selector.clone(),
                    })?;
                let top = geometry::page_offset(&self.dom, target).y - SCROLL_MARGIN_PX;
                self.schedule(
                    SCROLL_TICK_MS,
                    Deferred::ScrollTick {
                        target: top.max(0.0),
                        remaining_ms: self.config.animation_ms,
                        generation: self.generation,
                    },
                );
            }
        }

        self.dom.add_class(self.markers[step], CLASS_ACTIVE);
        let panel = self.build_panel(step, &definition)?;
        self.panel = Some(panel);
        self.current = Some(step);
        self.phase = Phase::Open;
        debug!("opened step {} of {}", step + 1, self.steps.len());

        if let Some(callback) = definition.on_open.clone() {
            callback.call();
        }
        Ok(())
    }

    /// Close the open panel, if any. Closing with nothing open is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        let Some(step) = self.current.take() else {
            debug!("close: no step open");
            return Ok(());
        };
        self.dom.remove_class(self.markers[step], CLASS_ACTIVE);
        if let Some(callback) = self.steps[step].on_close.clone() {
            callback.call();
        }
        if let Some(panel) = self.panel.take() {
            self.dom.remove_class(panel.root, CLASS_ACTIVE);
            // let the close transition play out before the node goes away
            self.schedule(
                self.config.animation_ms,
                Deferred::RemovePanel { panel: panel.root },
            );
        }
        if self.phase == Phase::Open {
            self.phase = Phase::Placed;
        }
        Ok(())
    }

    /// End the tour: close the panel, remove every marker, clear the
    /// tour-active class, and run the finish callback exactly once.
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.phase == Phase::Ended {
            return Ok(());
        }
        self.close()?;
        self.end_tour();
        Ok(())
    }

    /// Viewport resize invalidates the placed marker positions; the panel
    /// swaps to a refresh notice rather than recomputing them.
    pub fn handle_resize(&mut self) {
        if self.phase == Phase::Ended {
            return;
        }
        if let Some(panel) = self.panel.as_ref() {
            let (text, root) = (panel.text, panel.root);
            self.dom.set_text(text, RESIZE_NOTICE);
            self.dom.add_class(root, CLASS_MESSAGE);
        }
    }

    fn navigate(&mut self, step: usize) -> Result<(), Error> {
        if let Some(current) = self.current {
            // idempotent re-click on the open step's own marker
            if current == step {
                return Ok(());
            }
            self.close()?;
        }
        // supersede any pending open or scroll from an earlier navigation
        self.generation += 1;
        let generation = self.generation;
        // the uniform delay lets a just-closed panel settle before the next
        // one is built
        self.schedule(
            self.config.animation_ms,
            Deferred::OpenStep { step, generation },
        );
        Ok(())
    }

    fn build_panel(&mut self, step: usize, definition: &Step) -> Result<PanelRefs, Error> {
        let root = self.dom.create_from_markup(&self.config.panel_html)?;
        let body = self.dom.body();
        self.dom.append_child(body, root);

        let selectors = self.config.selectors.clone();
        let title = self.panel_part(root, &selectors.title)?;
        let progress = self.panel_part(root, &selectors.progress)?;
        let text = self.panel_part(root, &selectors.text)?;
        let back = self.panel_part(root, &selectors.back)?;
        let next = self.panel_part(root, &selectors.next)?;
        let finish = self.panel_part(root, &selectors.finish)?;
        let close = self.panel_part(root, &selectors.close)?;

        let number = step + 1;
        let total = self.steps.len();
        self.dom
            .set_text(progress, &format!("{number} of {total}"));
        if let Some(step_title) = &definition.title {
            self.dom.set_text(title, step_title);
        }
        self.dom.set_text(text, &definition.message);

        let back_step = step.checked_sub(1);
        let next_step = if number < total {
            Some(step + 1)
        } else if self.config.cycle {
            Some(0)
        } else {
            None
        };
        if let Some(target) = back_step {
            self.dom.set_attr(back, STEP_ID_ATTR, &target.to_string());
        }
        if let Some(target) = next_step {
            self.dom.set_attr(next, STEP_ID_ATTR, &target.to_string());
        }

        self.dom.add_class(root, CLASS_ACTIVE);
        if number == 1 {
            self.dom.add_class(back, CLASS_DISABLED);
        }
        if number == total {
            if !self.config.cycle {
                self.dom.add_class(next, CLASS_HIDE);
            }
            self.dom.remove_class(finish, CLASS_HIDE);
        }

        Ok(PanelRefs {
            root,
            title,
            progress,
            text,
            back,
            next,
            finish,
            close,
            back_step,
            next_step,
        })
    }

    fn panel_part(&self, root: NodeId, selector: &str) -> Result<NodeId, Error> {
        self.dom
            .query_within(root, selector)
            .ok_or_else(|| Error::SelectorUnmatched {
                selector: selector.to_string(),
            })
    }

    fn end_tour(&mut self) {
        let markers = std::mem::take(&mut self.markers);
        for marker in markers {
            self.dom.remove(marker);
        }
        self.dom.remove_class(self.container, CLASS_TOUR_ACTIVE);
        self.phase = Phase::Ended;
        debug!("tour ended");
        if let Some(callback) = self.config.finish_callback.clone() {
            callback.call();
        }
    }

    fn scroll_tick(&mut self, target: f64, remaining_ms: u64) {
        let current = self.dom.scroll_offset().y;
        let distance = target - current;
        if distance.abs() < f64::EPSILON {
            return;
        }
        if remaining_ms <= SCROLL_TICK_MS {
            self.dom.set_scroll_top(target);
            return;
        }
        let step = distance * SCROLL_TICK_MS as f64 / remaining_ms as f64;
        self.dom.set_scroll_top(current + step);
        self.schedule(
            SCROLL_TICK_MS,
            Deferred::ScrollTick {
                target,
                remaining_ms: remaining_ms - SCROLL_TICK_MS,
                generation: self.generation,
            },
        );
    }

    fn schedule(&mut self, delay_ms: u64, action: Deferred) {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.pending.push((id, action));
        self.requests.push(TimerRequest { id, delay_ms });
    }
}

impl<D: Dom> std::fmt::Debug for Tour<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tour")
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("steps", &self.steps.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
