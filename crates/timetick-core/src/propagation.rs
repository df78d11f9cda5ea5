//! Cascade propagation over the unit registry.
//!
//! Given the name of a unit (or the root tick) that just stepped, the
//! [`Propagator`] visits every registered unit in registration order and
//! lets each dependent react:
//!
//! - **Simple** dependents add the parent's step to their counter and fire
//!   once per whole `trigger_count` accumulated.
//! - **Complex** dependents re-check every threshold and fire on the rising
//!   edge of "all conditions met", latching until a high-order tracked unit
//!   falls back below its threshold.
//!
//! Each firing updates the value (with overflow reset and wraparound), records
//! a [`TimeEvent::UnitChanged`] if the value moved, and only then recurses
//! into the firing unit's own dependents. Recursion depth is bounded by the
//! depth of the dependency forest. A cyclic configuration recurses without
//! bound; cycles are not detected.
//!
//! Reverse propagation handles simple units only. Complex units are skipped.

use tracing::{debug, warn};

use crate::error::UnitError;
use crate::event::{Diagnostic, TickReport, TimeEvent};
use crate::store::UnitStore;
use crate::unit::{ROOT_TICK, UnitKind};
use crate::wrap::wrap_counted;

/// Lowest value an unbounded unit can reach when stepping in reverse.
pub const REVERSE_FLOOR: i64 = 0;

/// How a dependent reacts to one parent step.
enum Reaction {
    Simple,
    Complex,
}

/// One cascade pass over a [`UnitStore`].
///
/// Borrows the store mutably for the duration of the cascade and appends
/// everything it does to a [`TickReport`].
#[derive(Debug)]
pub struct Propagator<'a> {
    store: &'a mut UnitStore,
    root_tick: i64,
    report: &'a mut TickReport,
}

impl<'a> Propagator<'a> {
    /// Create a propagator. `root_tick` is the value complex thresholds on
    /// [`ROOT_TICK`] are compared against.
    pub const fn new(store: &'a mut UnitStore, root_tick: i64, report: &'a mut TickReport) -> Self {
        Self {
            store,
            root_tick,
            report,
        }
    }

    /// Propagate one forward step of `parent` to its dependents.
    pub fn increment(&mut self, parent: &str) {
        for child in self.store.list_names() {
            match self.reaction(&child, parent, true) {
                Some(Reaction::Simple) => {
                    if let Err(err) = self.simple_forward(&child, parent) {
                        warn!(unit = %child, error = %err, "Skipping simple unit");
                    }
                }
                Some(Reaction::Complex) => self.complex_forward(&child),
                None => {}
            }
        }
    }

    /// Propagate one reverse step of `parent` to its simple dependents.
    pub fn decrement(&mut self, parent: &str) {
        for child in self.store.list_names() {
            if !matches!(self.reaction(&child, parent, false), Some(Reaction::Simple)) {
                continue;
            }
            if let Err(err) = self.simple_reverse(&child, parent) {
                warn!(unit = %child, error = %err, "Skipping simple unit");
            }
        }
    }

    fn reaction(&self, child: &str, parent: &str, forward: bool) -> Option<Reaction> {
        let unit = self.store.get(child)?;
        if !unit.depends_on(parent) {
            return None;
        }
        match unit.kind {
            UnitKind::Simple { .. } => Some(Reaction::Simple),
            UnitKind::Complex { .. } if forward => Some(Reaction::Complex),
            UnitKind::Complex { .. } => None,
        }
    }

    /// How much one step of `parent` contributes to a dependent's counter.
    fn parent_step(&self, parent: &str) -> i64 {
        if parent == ROOT_TICK {
            1
        } else {
            self.store.step(parent)
        }
    }

    /// Current value of a tracked name, `None` if it resolves to nothing.
    fn tracked_value(&self, tracked: &str) -> Option<i64> {
        if tracked == ROOT_TICK {
            Some(self.root_tick)
        } else {
            self.store.get(tracked).map(|unit| unit.value)
        }
    }

    // -----------------------------------------------------------------------
    // Simple units
    // -----------------------------------------------------------------------

    fn simple_forward(&mut self, child: &str, parent: &str) -> Result<(), UnitError> {
        let trigger_count = self.store.trigger_count(child)?;
        let mut counter = self
            .store
            .counter(child)
            .saturating_add(self.parent_step(parent));

        while trigger_count > 0 && counter >= trigger_count {
            counter = counter.saturating_sub(trigger_count);
            self.store.set_counter(child, counter)?;
            let cascades = self.fire_forward(child);
            for _ in 0..cascades {
                self.increment(child);
            }
        }
        self.store.set_counter(child, counter)
    }

    fn simple_reverse(&mut self, child: &str, parent: &str) -> Result<(), UnitError> {
        let trigger_count = self.store.trigger_count(child)?;
        let mut counter = self
            .store
            .counter(child)
            .saturating_sub(self.parent_step(parent));

        while trigger_count > 0 && counter < 0 {
            counter = counter.saturating_add(trigger_count);
            self.store.set_counter(child, counter)?;
            let cascades = self.fire_reverse(child);
            for _ in 0..cascades {
                self.decrement(child);
            }
        }
        self.store.set_counter(child, counter)
    }

    // -----------------------------------------------------------------------
    // Complex units
    // -----------------------------------------------------------------------

    fn complex_forward(&mut self, child: &str) {
        let Some(unit) = self.store.get(child) else {
            return;
        };
        let UnitKind::Complex {
            thresholds,
            rearm_on,
            triggered,
        } = &unit.kind
        else {
            return;
        };

        let mut all_met = true;
        let mut rearm = false;
        for (tracked, threshold) in thresholds {
            let met = self
                .tracked_value(tracked)
                .is_some_and(|current| current >= *threshold);
            if !met {
                all_met = false;
                rearm |= rearm_on.contains(tracked);
            }
        }
        let latched = *triggered;

        if all_met && !latched {
            let _ = self.store.set_triggered(child, true);
            let cascades = self.fire_forward(child);
            for _ in 0..cascades {
                self.increment(child);
            }
        } else if !all_met && latched && rearm {
            let _ = self.store.set_triggered(child, false);
            debug!(unit = child, "Complex unit re-armed");
        }
    }

    // -----------------------------------------------------------------------
    // Value updates
    // -----------------------------------------------------------------------

    /// Apply one forward step to `child`. Returns how many cascades its
    /// dependents should receive: one, or one per range wrapped when a
    /// single step wraps more than once.
    fn fire_forward(&mut self, child: &str) -> u64 {
        let Some(unit) = self.store.get(child) else {
            return 0;
        };
        let (old, step, min, max) = (unit.value, unit.step, unit.min, unit.max);

        let candidate = old
            .checked_add(step)
            .unwrap_or_else(|| self.arithmetic_limit(child, min));
        let (new, wraps) = wrap_counted(candidate, min, max);
        self.commit(child, old, new);
        wraps.max(1)
    }

    /// Apply one reverse step to `child`. Returns how many reverse cascades
    /// its dependents should receive, mirroring [`Self::fire_forward`].
    fn fire_reverse(&mut self, child: &str) -> u64 {
        let Some(unit) = self.store.get(child) else {
            return 0;
        };
        let (old, step, min, max, bounded) =
            (unit.value, unit.step, unit.min, unit.max, unit.is_bounded());

        let candidate = old
            .checked_sub(step)
            .unwrap_or_else(|| self.arithmetic_limit(child, min));
        let (new, wraps) = if bounded {
            wrap_counted(candidate, min, max)
        } else {
            (candidate.max(REVERSE_FLOOR), 0)
        };
        self.commit(child, old, new);
        wraps.max(1)
    }

    fn commit(&mut self, child: &str, old: i64, new: i64) {
        if self.store.set_value(child, new).is_err() {
            return;
        }
        if new != old {
            debug!(unit = child, old, new, "Unit changed");
            self.report.events.push(TimeEvent::UnitChanged {
                unit: child.to_owned(),
                new_value: new,
                old_value: old,
            });
        }
    }

    fn arithmetic_limit(&mut self, child: &str, min: i64) -> i64 {
        warn!(unit = child, reset_to = min, "Time unit step left the integer range, resetting");
        self.report.diagnostics.push(Diagnostic::ArithmeticLimit {
            unit: child.to_owned(),
            reset_to: min,
        });
        min
    }
}
