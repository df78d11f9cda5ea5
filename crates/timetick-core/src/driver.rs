//! Tick driver: turns elapsed time into root ticks.
//!
//! The driver owns the root tick counter, the elapsed-time accumulator, the
//! time scale, and the pause state, plus the [`UnitStore`] the root tick
//! drives. The host calls [`TickDriver::advance`] from its own loop with the
//! time elapsed since the previous call; no wall clock is read here.
//!
//! # Design Principles
//!
//! - Every consumed tick is one full top-to-bottom cascade, so recursion
//!   depth depends on the unit forest, never on how much time was passed in.
//! - While paused, time input is discarded, not deferred. Resuming does not
//!   catch up.
//! - In reverse, the root tick saturates at 0. Hitting the floor drops the
//!   remaining reverse time for that call and reports it once.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::UnitError;
use crate::event::{Diagnostic, TickReport, TimeEvent};
use crate::format;
use crate::propagation::Propagator;
use crate::snapshot::Snapshot;
use crate::store::UnitStore;
use crate::unit::{ROOT_TICK, UnitKind};

/// Smallest accepted tick duration, in time units.
pub const MIN_TICK_DURATION: f64 = 0.001;

/// Largest accepted tick duration, in time units.
pub const MAX_TICK_DURATION: f64 = 600.0;

/// Largest accepted time scale magnitude.
pub const MAX_TIME_SCALE: f64 = 1000.0;

/// Highest root tick before it restarts at 0.
pub const MAX_TICK: u64 = i64::MAX.unsigned_abs();

/// Whether time input is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Time input accumulates and produces ticks.
    #[default]
    Active,
    /// Time input is accepted and discarded.
    Paused,
}

/// Root tick source and owner of the unit registry.
#[derive(Debug, Clone)]
pub struct TickDriver {
    /// Registered time units.
    store: UnitStore,
    /// Root tick count.
    tick: u64,
    /// Scaled time accumulated toward the next tick. Negative in reverse.
    accumulated: f64,
    /// Time per root tick.
    tick_duration: f64,
    /// Multiplier applied to every delta. Negative runs time backwards.
    time_scale: f64,
    /// Active or paused.
    state: DriverState,
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TickDriver {
    /// Create a driver with an empty registry at tick 0.
    ///
    /// `tick_duration` is clamped to
    /// [`MIN_TICK_DURATION`]..=[`MAX_TICK_DURATION`].
    pub fn new(tick_duration: f64) -> Self {
        Self {
            store: UnitStore::new(),
            tick: 0,
            accumulated: 0.0,
            tick_duration: clamp_tick_duration(tick_duration),
            time_scale: 1.0,
            state: DriverState::Active,
        }
    }

    /// Rebuild a driver from a [`Snapshot`].
    pub fn restore(snapshot: Snapshot) -> Self {
        let store = UnitStore::from_parts(snapshot.units, &snapshot.counters);
        let tick_duration = clamp_tick_duration(snapshot.tick_duration);
        let accumulated = if snapshot.accumulated.is_finite() {
            snapshot.accumulated
        } else {
            0.0
        };
        Self {
            store,
            tick: snapshot.tick.min(MAX_TICK),
            accumulated,
            tick_duration,
            time_scale: clamp_time_scale(snapshot.time_scale),
            state: if snapshot.paused {
                DriverState::Paused
            } else {
                DriverState::Active
            },
        }
    }

    /// Capture the full driver state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            accumulated: self.accumulated,
            tick_duration: self.tick_duration,
            time_scale: self.time_scale,
            paused: self.is_paused(),
            units: self.store.units().cloned().collect(),
            counters: self.store.counters().clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Time input
    // -----------------------------------------------------------------------

    /// Feed `delta` elapsed time into the driver and run every whole tick it
    /// completes, forward or reverse depending on the sign of the time scale.
    pub fn advance(&mut self, delta: f64) -> TickReport {
        let mut report = TickReport::new();
        if self.state == DriverState::Paused {
            return report;
        }
        if !delta.is_finite() {
            warn!(delta, "Ignoring non-finite time delta");
            return report;
        }

        self.accumulated += delta * self.time_scale;

        if self.time_scale >= 0.0 {
            while self.accumulated >= self.tick_duration {
                self.accumulated -= self.tick_duration;
                self.step_forward(&mut report);
            }
        } else {
            while self.accumulated <= -self.tick_duration {
                self.accumulated += self.tick_duration;
                if !self.step_reverse(&mut report) {
                    break;
                }
            }
        }
        report
    }

    /// Advance the root tick by exactly `count` ticks, ignoring pause state
    /// and time scale.
    pub fn advance_ticks(&mut self, count: u64) -> TickReport {
        let mut report = TickReport::new();
        for _ in 0..count {
            self.step_forward(&mut report);
        }
        report
    }

    /// Rewind the root tick by up to `count` ticks, stopping at 0.
    pub fn rewind_ticks(&mut self, count: u64) -> TickReport {
        let mut report = TickReport::new();
        for _ in 0..count {
            if !self.step_reverse(&mut report) {
                break;
            }
        }
        report
    }

    fn step_forward(&mut self, report: &mut TickReport) {
        if self.tick >= MAX_TICK {
            warn!(tick = self.tick, "Tick count reached maximum value, resetting to 0");
            report.diagnostics.push(Diagnostic::TickCeilingReached);
            self.tick = 0;
        } else {
            self.tick = self.tick.saturating_add(1);
        }

        let root = self.root_value();
        Propagator::new(&mut self.store, root, report).increment(ROOT_TICK);
        report.events.push(TimeEvent::TickAdvanced { tick: self.tick });
    }

    /// Returns `false` when the floor stopped the step.
    fn step_reverse(&mut self, report: &mut TickReport) -> bool {
        let Some(previous) = self.tick.checked_sub(1) else {
            warn!("Tick count reached minimum value (0), cannot decrement further");
            report.diagnostics.push(Diagnostic::TickFloorReached);
            self.accumulated = 0.0;
            return false;
        };
        self.tick = previous;

        let root = self.root_value();
        Propagator::new(&mut self.store, root, report).decrement(ROOT_TICK);
        report.events.push(TimeEvent::TickAdvanced { tick: self.tick });
        true
    }

    fn root_value(&self) -> i64 {
        i64::try_from(self.tick).unwrap_or(i64::MAX)
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    /// Stop applying time input.
    pub fn pause(&mut self) {
        self.state = DriverState::Paused;
        debug!(tick = self.tick, "Tick driver paused");
    }

    /// Resume applying time input. Time delivered while paused is lost.
    pub fn resume(&mut self) {
        self.state = DriverState::Active;
        debug!(tick = self.tick, "Tick driver resumed");
    }

    /// Flip between paused and active.
    pub fn toggle_pause(&mut self) {
        match self.state {
            DriverState::Active => self.pause(),
            DriverState::Paused => self.resume(),
        }
    }

    /// Whether time input is currently discarded.
    pub fn is_paused(&self) -> bool {
        self.state == DriverState::Paused
    }

    /// Current state.
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Return the root tick, the accumulator, every unit value, and every
    /// counter to 0. Registrations are kept.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.accumulated = 0.0;
        self.store.reset_to_zero();
        info!("Tick driver reset");
    }

    /// Return the root tick and accumulator to 0 and every unit to its
    /// minimum. Registrations are kept.
    pub fn reset_to_min(&mut self) {
        self.tick = 0;
        self.accumulated = 0.0;
        self.store.reset_to_min();
        info!("Tick driver reset to unit minimums");
    }

    /// Drop every registered unit and stop applying time input.
    pub fn shutdown(&mut self) {
        self.store.clear();
        self.accumulated = 0.0;
        self.state = DriverState::Paused;
        info!(tick = self.tick, "Tick driver shut down");
    }

    // -----------------------------------------------------------------------
    // Timing parameters
    // -----------------------------------------------------------------------

    /// Current root tick.
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Fraction of the way to the next tick, in `[0, 1]`.
    pub fn tick_progress(&self) -> f64 {
        (self.accumulated / self.tick_duration).clamp(0.0, 1.0)
    }

    /// Time per root tick.
    pub const fn tick_duration(&self) -> f64 {
        self.tick_duration
    }

    /// Set the time per root tick, clamped to
    /// [`MIN_TICK_DURATION`]..=[`MAX_TICK_DURATION`].
    pub fn set_tick_duration(&mut self, duration: f64) {
        self.tick_duration = clamp_tick_duration(duration);
    }

    /// Current time scale.
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the time scale, clamped to `[-MAX_TIME_SCALE, MAX_TIME_SCALE]`.
    /// Negative values run time backwards.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = clamp_time_scale(scale);
    }

    // -----------------------------------------------------------------------
    // Units
    // -----------------------------------------------------------------------

    /// Read access to the unit registry.
    pub const fn units(&self) -> &UnitStore {
        &self.store
    }

    /// Write access to the unit registry for registration and configuration.
    pub const fn units_mut(&mut self) -> &mut UnitStore {
        &mut self.store
    }

    /// Current value of a unit, or of the root tick for [`ROOT_TICK`].
    pub fn value(&self, name: &str) -> i64 {
        if name == ROOT_TICK {
            self.root_value()
        } else {
            self.store.value(name)
        }
    }

    /// Set one unit's value and, for a simple unit, restart its counter.
    /// Reports a change event if the stored value moved.
    pub fn set_value(&mut self, name: &str, value: i64) -> Result<TickReport, UnitError> {
        let old = self.store.value(name);
        self.store.set_value(name, value)?;
        if !self.store.is_complex(name) {
            self.store.set_counter(name, 0)?;
        }

        let mut report = TickReport::new();
        let new = self.store.value(name);
        if new != old {
            report.events.push(TimeEvent::UnitChanged {
                unit: name.to_owned(),
                new_value: new,
                old_value: old,
            });
        }
        Ok(report)
    }

    /// Assign several unit values at once, then rebuild every simple unit's
    /// counter from its parent so counting resumes from the new position.
    ///
    /// Unknown names are skipped. One event is reported per assigned unit.
    pub fn set_values(&mut self, values: &BTreeMap<String, i64>) -> TickReport {
        let mut report = TickReport::new();
        let mut assigned = Vec::new();
        for (name, value) in values {
            let old = self.store.value(name);
            if self.store.set_value(name, *value).is_ok() {
                assigned.push((name.clone(), old));
            }
        }

        for name in self.store.list_names() {
            let Some(counter) = self.derived_counter(&name) else {
                continue;
            };
            if let Err(err) = self.store.set_counter(&name, counter) {
                warn!(unit = %name, error = %err, "Counter rebuild skipped");
            }
        }

        for (name, old) in assigned {
            let new_value = self.store.value(&name);
            report.events.push(TimeEvent::UnitChanged {
                unit: name,
                new_value,
                old_value: old,
            });
        }
        report
    }

    /// Counter implied by a simple unit's parent position, reduced into
    /// `[0, trigger_count)`. Unresolved parents give 0; complex units have
    /// no counter.
    fn derived_counter(&self, name: &str) -> Option<i64> {
        let Some(UnitKind::Simple {
            tracked,
            trigger_count,
        }) = self.store.get(name).map(|unit| &unit.kind)
        else {
            return None;
        };

        let raw = if tracked == ROOT_TICK {
            self.root_value()
        } else if let Some(parent) = self.store.get(tracked) {
            parent.value.saturating_mul(parent.step)
        } else {
            0
        };
        Some(raw.checked_rem_euclid(*trigger_count).unwrap_or(0))
    }

    // -----------------------------------------------------------------------
    // Formatting
    // -----------------------------------------------------------------------

    /// Replace `{unit}` placeholders with current values.
    pub fn formatted(&self, template: &str) -> String {
        format::format_template(&self.store, template)
    }

    /// Zero-padded values of `units` joined by `separator`.
    pub fn formatted_padded(&self, units: &[&str], separator: &str, padding: usize) -> String {
        format::format_padded(&self.store, units, separator, padding)
    }
}

fn clamp_tick_duration(duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        warn!(
            duration,
            clamped = MIN_TICK_DURATION,
            "Tick duration must be greater than 0, clamping"
        );
        return MIN_TICK_DURATION;
    }
    duration.clamp(MIN_TICK_DURATION, MAX_TICK_DURATION)
}

fn clamp_time_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        warn!("Time scale is NaN, using 1.0");
        return 1.0;
    }
    scale.clamp(-MAX_TIME_SCALE, MAX_TIME_SCALE)
}
