//! Change events and diagnostics produced by propagation and time advance.
//!
//! Instead of invoking observer callbacks mid-cascade, every call returns a
//! [`TickReport`] listing what changed, in the order it happened. Recoverable
//! conditions are logged through `tracing` and also listed as
//! [`Diagnostic`]s so a host can inspect them without a subscriber.

use serde::{Deserialize, Serialize};

/// A discrete, observable change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimeEvent {
    /// A unit's value changed.
    UnitChanged {
        /// Name of the unit that changed.
        unit: String,
        /// Value after the change.
        new_value: i64,
        /// Value before the change.
        old_value: i64,
    },

    /// The root tick moved by one step.
    TickAdvanced {
        /// The new root tick count.
        tick: u64,
    },
}

/// A recoverable condition reported during a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A step would have left the integer range; the unit was reset.
    ArithmeticLimit {
        /// The unit that hit the limit.
        unit: String,
        /// The value the unit was reset to.
        reset_to: i64,
    },

    /// A tracked reference names a unit that is not registered.
    UnknownUnit {
        /// The unit holding the reference.
        unit: String,
        /// The unresolved name.
        reference: String,
    },

    /// Reverse time reached tick 0; the remaining reverse time was dropped.
    TickFloorReached,

    /// The root tick reached its maximum and restarted at 0.
    TickCeilingReached,
}

/// Everything a single propagation or advance call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Change events in emission order.
    pub events: Vec<TimeEvent>,
    /// Recoverable conditions in the order they were hit.
    pub diagnostics: Vec<Diagnostic>,
}

impl TickReport {
    /// Create an empty report.
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.diagnostics.is_empty()
    }

    /// Iterate over `(new, old)` value pairs recorded for one unit.
    pub fn changes_for<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = (i64, i64)> + 'a {
        self.events.iter().filter_map(move |event| match event {
            TimeEvent::UnitChanged {
                unit: changed,
                new_value,
                old_value,
            } if changed == unit => Some((*new_value, *old_value)),
            _ => None,
        })
    }

    /// Number of root tick steps recorded.
    pub fn ticks_advanced(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TimeEvent::TickAdvanced { .. }))
            .count()
    }
}
