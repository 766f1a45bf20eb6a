//! Caret blinking.
//!
//! Timers are deadlines checked by `tick`, which the host calls from its
//! event loop. Dropping a deadline cancels the timer.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkState {
    Blinking { visible: bool, next_toggle: Instant },
    FrozenVisible { resume_at: Instant },
    Stopped,
}

#[derive(Clone, Debug)]
pub struct CaretBlink {
    state: BlinkState,
    interval: Duration,
    quiet_period: Duration,
}

impl CaretBlink {
    pub fn new(interval: Duration, quiet_period: Duration) -> Self {
        Self {
            state: BlinkState::Stopped,
            interval,
            quiet_period,
        }
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    /// Begin toggling, starting from a visible caret.
    pub fn start(&mut self, now: Instant) {
        self.state = BlinkState::Blinking {
            visible: true,
            next_toggle: now + self.interval,
        };
    }

    /// Hold the caret visible and resume blinking after the quiet period.
    /// Has no effect while stopped.
    pub fn freeze(&mut self, now: Instant) {
        if self.state == BlinkState::Stopped {
            return;
        }
        self.state = BlinkState::FrozenVisible {
            resume_at: now + self.quiet_period,
        };
    }

    /// Cancel every pending timer.
    pub fn destroy(&mut self) {
        if self.state != BlinkState::Stopped {
            tracing::trace!(target: "mathpad::blink", "caret blink stopped");
        }
        self.state = BlinkState::Stopped;
    }

    /// Fire due timers. Returns true when visibility changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            BlinkState::Blinking {
                visible,
                next_toggle,
            } if now >= next_toggle => {
                self.state = BlinkState::Blinking {
                    visible: !visible,
                    next_toggle: now + self.interval,
                };
                true
            }
            BlinkState::FrozenVisible { resume_at } if now >= resume_at => {
                self.state = BlinkState::Blinking {
                    visible: true,
                    next_toggle: now + self.interval,
                };
                false
            }
            _ => false,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self.state {
            BlinkState::Blinking { visible, .. } => visible,
            BlinkState::FrozenVisible { .. } => true,
            BlinkState::Stopped => false,
        }
    }

    /// Earliest pending deadline, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            BlinkState::Blinking { next_toggle, .. } => Some(next_toggle),
            BlinkState::FrozenVisible { resume_at } => Some(resume_at),
            BlinkState::Stopped => None,
        }
    }
}
