//! Submit detection
//!
//! The host page never announces "the user submitted"; the only
//! reliable tell is the submit control flipping from enabled to
//! disabled while the page processes the post. This module models that
//! inference as one explicit state machine per compose session:
//!
//! ```text
//! Idle --accepted disable transition--> Posting --dispatch done--> CoolingDown --5s--> Idle
//! ```
//!
//! Time is injected by the caller, so every transition is testable
//! without a clock.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Minimum gap between two accepted submits. Disable transitions
/// inside this window are duplicate DOM events for one logical submit.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

/// Wait after an accepted transition before capturing is acted on; the
/// host page's own disable-then-process sequence needs to finish first.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Quiet period after a dispatch completes, absorbing the mutation
/// noise the host page emits around one submit.
pub const COOLDOWN: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Watching the submit control for a disable transition
    Idle,
    /// A captured payload is being dispatched; new signals are dropped
    Posting,
    /// Dispatch finished; nothing is accepted until the cooldown ends
    CoolingDown,
}

/// An accepted submit: the driver should capture now and dispatch once
/// `dispatch_at` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitSignal {
    pub dispatch_at: Instant,
}

#[derive(Debug)]
pub struct SubmitDetector {
    state: DetectorState,
    /// Disabled state seen on the previous observation
    control_disabled: bool,
    last_accepted: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl Default for SubmitDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitDetector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::Idle,
            control_disabled: false,
            last_accepted: None,
            cooldown_until: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Advance time-driven transitions; currently `CoolingDown → Idle`.
    /// Leaving the cooldown resets all bookkeeping, so the next disable
    /// transition is accepted immediately.
    pub fn tick(&mut self, now: Instant) {
        if self.state == DetectorState::CoolingDown {
            if let Some(until) = self.cooldown_until {
                if now >= until {
                    debug!("Cooldown elapsed, detector back to idle");
                    self.state = DetectorState::Idle;
                    self.cooldown_until = None;
                    self.last_accepted = None;
                    self.control_disabled = false;
                }
            }
        }
    }

    /// Feed one observation of the submit control's disabled state.
    ///
    /// Returns a signal when this observation is an accepted submit: a
    /// not-disabled → disabled transition, in `Idle`, at least
    /// [`DEBOUNCE_WINDOW`] after the previous accepted one.
    pub fn observe(&mut self, disabled: bool, now: Instant) -> Option<SubmitSignal> {
        self.tick(now);

        let was_disabled = self.control_disabled;
        self.control_disabled = disabled;

        if self.state != DetectorState::Idle {
            return None;
        }
        if !disabled || was_disabled {
            return None;
        }
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < DEBOUNCE_WINDOW {
                debug!("Ignoring disable transition inside the debounce window");
                return None;
            }
        }

        self.last_accepted = Some(now);
        Some(SubmitSignal {
            dispatch_at: now + SETTLE_DELAY,
        })
    }

    /// The captured payload is being handed to the dispatcher
    pub fn begin_dispatch(&mut self) {
        if self.state == DetectorState::Idle {
            self.state = DetectorState::Posting;
        }
    }

    /// Dispatch completed (success or failure); start the cooldown
    pub fn finish_dispatch(&mut self, now: Instant) {
        self.state = DetectorState::CoolingDown;
        self.cooldown_until = Some(now + COOLDOWN);
    }
}
