//! Registry of time units and their accumulation counters.
//!
//! The store is passive: it validates and records configuration, answers
//! queries, and exposes counter accessors, but never decides when a unit
//! fires. That is the job of [`propagation`](crate::propagation).
//!
//! # Conventions
//!
//! - Units are iterated in registration order. Re-registering a name
//!   replaces the unit in place (no merge) and resets its counter.
//! - Getters on an unknown name return the type's zero value.
//! - Setters on an unknown name return [`UnitError::UnknownUnit`] and change
//!   nothing.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, warn};

use crate::error::UnitError;
use crate::event::Diagnostic;
use crate::unit::{ROOT_TICK, TimeUnit, UnitKind, default_rearm_units};
use crate::wrap::wrap;

/// Insertion-ordered registry of [`TimeUnit`]s plus per-unit counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitStore {
    /// Unit records keyed by name.
    units: BTreeMap<String, TimeUnit>,
    /// Registration order of unit names.
    order: Vec<String>,
    /// Accumulated parent steps since the last firing (simple units only).
    counters: BTreeMap<String, i64>,
}

impl UnitStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            order: Vec::new(),
            counters: BTreeMap::new(),
        }
    }

    /// Rebuild a store from units in registration order and their counters.
    ///
    /// Later duplicates replace earlier ones in place. Counters for names
    /// that are not simple units are dropped.
    pub fn from_parts(units: Vec<TimeUnit>, counters: &BTreeMap<String, i64>) -> Self {
        let mut store = Self::new();
        for unit in units {
            let counter = counters.get(&unit.name).copied().unwrap_or(0);
            let name = unit.name.clone();
            let simple = !unit.is_complex();
            store.insert(unit);
            if simple {
                store.counters.insert(name, counter);
            }
        }
        store
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a simple unit that fires every `trigger_count` steps of
    /// `tracked`. The unit starts at `min` with a step of 1.
    ///
    /// Returns a [`Diagnostic::UnknownUnit`] if `tracked` is neither the root
    /// tick nor a registered unit; the registration still succeeds.
    pub fn register_simple(
        &mut self,
        name: &str,
        tracked: &str,
        trigger_count: i64,
        max: i64,
        min: i64,
    ) -> Result<Vec<Diagnostic>, UnitError> {
        validate_name(name)?;
        if trigger_count <= 0 {
            return Err(reject(UnitError::InvalidTriggerCount {
                name: name.to_owned(),
                trigger_count,
            }));
        }
        validate_range(name, min, max)?;

        let unit = TimeUnit::simple(name, tracked, trigger_count, max, min);
        let diagnostics = self.unresolved(&unit);
        self.insert(unit);
        self.counters.insert(name.to_owned(), 0);
        debug!(unit = name, tracked, trigger_count, max, min, "Simple unit registered");
        Ok(diagnostics)
    }

    /// Register a complex unit that fires once each time every tracked unit
    /// reaches its threshold. The unit starts at `min` with a step of 1.
    ///
    /// Unresolved tracked names are reported as diagnostics, not errors.
    pub fn register_complex(
        &mut self,
        name: &str,
        thresholds: BTreeMap<String, i64>,
        max: i64,
        min: i64,
    ) -> Result<Vec<Diagnostic>, UnitError> {
        validate_name(name)?;
        if thresholds.is_empty() {
            return Err(reject(UnitError::EmptyTrackedUnits {
                name: name.to_owned(),
            }));
        }
        if let Some((tracked, threshold)) = thresholds.iter().find(|(_, value)| **value <= 0) {
            return Err(reject(UnitError::InvalidThreshold {
                name: name.to_owned(),
                tracked: tracked.clone(),
                threshold: *threshold,
            }));
        }
        validate_range(name, min, max)?;

        let tracked_count = thresholds.len();
        let unit = TimeUnit::complex(name, thresholds, max, min);
        let diagnostics = self.unresolved(&unit);
        self.insert(unit);
        self.counters.remove(name);
        debug!(unit = name, tracked_count, max, min, "Complex unit registered");
        Ok(diagnostics)
    }

    /// Remove a unit and its counter, returning the removed record.
    pub fn unregister(&mut self, name: &str) -> Result<TimeUnit, UnitError> {
        let unit = self.units.remove(name).ok_or_else(|| unknown(name))?;
        self.order.retain(|entry| entry != name);
        self.counters.remove(name);
        debug!(unit = name, "Unit unregistered");
        Ok(unit)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Full record of a unit.
    pub fn get(&self, name: &str) -> Option<&TimeUnit> {
        self.units.get(name)
    }

    /// Current value, or 0 for an unknown name.
    pub fn value(&self, name: &str) -> i64 {
        self.units.get(name).map_or(0, |unit| unit.value)
    }

    /// Step amount, or 0 for an unknown name.
    pub fn step(&self, name: &str) -> i64 {
        self.units.get(name).map_or(0, |unit| unit.step)
    }

    /// Trigger count of a simple unit, or 0 for an unknown name.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::ComplexTriggerCount`] for a complex unit.
    pub fn trigger_count(&self, name: &str) -> Result<i64, UnitError> {
        match self.units.get(name).map(|unit| &unit.kind) {
            None => Ok(0),
            Some(UnitKind::Simple { trigger_count, .. }) => Ok(*trigger_count),
            Some(UnitKind::Complex { .. }) => Err(UnitError::ComplexTriggerCount {
                name: name.to_owned(),
            }),
        }
    }

    /// Lower wrap bound, or 0 for an unknown name.
    pub fn min_value(&self, name: &str) -> i64 {
        self.units.get(name).map_or(0, |unit| unit.min)
    }

    /// Upper wrap bound, or 0 for an unknown name.
    pub fn max_value(&self, name: &str) -> i64 {
        self.units.get(name).map_or(0, |unit| unit.max)
    }

    /// Parent of a simple unit.
    pub fn tracked_unit(&self, name: &str) -> Option<&str> {
        match self.units.get(name).map(|unit| &unit.kind) {
            Some(UnitKind::Simple { tracked, .. }) => Some(tracked.as_str()),
            _ => None,
        }
    }

    /// Thresholds of a complex unit.
    pub fn tracked_units(&self, name: &str) -> Option<&BTreeMap<String, i64>> {
        match self.units.get(name).map(|unit| &unit.kind) {
            Some(UnitKind::Complex { thresholds, .. }) => Some(thresholds),
            _ => None,
        }
    }

    /// Whether a complex unit's edge trigger is currently latched.
    pub fn is_triggered(&self, name: &str) -> bool {
        matches!(
            self.units.get(name).map(|unit| &unit.kind),
            Some(UnitKind::Complex { triggered: true, .. })
        )
    }

    /// Whether `name` is a registered complex unit.
    pub fn is_complex(&self, name: &str) -> bool {
        self.units.get(name).is_some_and(TimeUnit::is_complex)
    }

    /// Unit names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Owned copy of the unit names in registration order.
    pub fn list_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Unit records in registration order.
    pub fn units(&self) -> impl Iterator<Item = &TimeUnit> {
        self.order.iter().filter_map(|name| self.units.get(name))
    }

    /// All counters keyed by unit name.
    pub const fn counters(&self) -> &BTreeMap<String, i64> {
        &self.counters
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    // -----------------------------------------------------------------------
    // Setters
    // -----------------------------------------------------------------------

    /// Set a unit's value, wrapped into its range.
    pub fn set_value(&mut self, name: &str, value: i64) -> Result<(), UnitError> {
        let unit = self.unit_mut(name)?;
        unit.value = wrap(value, unit.min, unit.max);
        Ok(())
    }

    /// Set the amount a unit moves per trigger. May be negative.
    pub fn set_step(&mut self, name: &str, step: i64) -> Result<(), UnitError> {
        self.unit_mut(name)?.step = step;
        Ok(())
    }

    /// Set how many parent steps a simple unit needs per firing.
    ///
    /// # Errors
    ///
    /// Rejects non-positive counts, complex units, and unknown names.
    pub fn set_trigger_count(&mut self, name: &str, count: i64) -> Result<(), UnitError> {
        if count <= 0 {
            return Err(reject(UnitError::InvalidTriggerCount {
                name: name.to_owned(),
                trigger_count: count,
            }));
        }
        match &mut self.unit_mut(name)?.kind {
            UnitKind::Simple { trigger_count, .. } => {
                *trigger_count = count;
                Ok(())
            }
            UnitKind::Complex { .. } => Err(reject(UnitError::ComplexTriggerCount {
                name: name.to_owned(),
            })),
        }
    }

    /// Set a unit's lower bound and wrap the current value into the new
    /// range.
    ///
    /// # Errors
    ///
    /// Rejects a bound that would empty a bounded range.
    pub fn set_min_value(&mut self, name: &str, min: i64) -> Result<(), UnitError> {
        let max = self.get(name).ok_or_else(|| reject(unknown(name)))?.max;
        validate_range(name, min, max)?;
        let unit = self.unit_mut(name)?;
        unit.min = min;
        unit.value = wrap(unit.value, min, max);
        Ok(())
    }

    /// Choose which tracked units re-arm a complex unit when they fall
    /// below their threshold. An empty set restores the default.
    pub fn set_rearm_units(&mut self, name: &str, units: BTreeSet<String>) -> Result<(), UnitError> {
        match &mut self.unit_mut(name)?.kind {
            UnitKind::Complex {
                thresholds,
                rearm_on,
                ..
            } => {
                *rearm_on = if units.is_empty() {
                    default_rearm_units(thresholds)
                } else {
                    units
                };
                Ok(())
            }
            UnitKind::Simple { .. } => Err(UnitError::NotComplex {
                name: name.to_owned(),
            }),
        }
    }

    /// Latch or release a complex unit's edge trigger. No-op for simple units.
    pub fn set_triggered(&mut self, name: &str, latched: bool) -> Result<(), UnitError> {
        if let UnitKind::Complex { triggered, .. } = &mut self.unit_mut(name)?.kind {
            *triggered = latched;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    /// Accumulated parent steps for a unit, or 0 if none recorded.
    pub fn counter(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Overwrite a simple unit's counter.
    ///
    /// # Errors
    ///
    /// Rejects unknown names and complex units, which keep no counter.
    pub fn set_counter(&mut self, name: &str, value: i64) -> Result<(), UnitError> {
        *self.counter_mut(name)? = value;
        Ok(())
    }

    /// Add `amount` to a simple unit's counter (saturating).
    pub fn increment_counter(&mut self, name: &str, amount: i64) -> Result<(), UnitError> {
        let counter = self.counter_mut(name)?;
        *counter = counter.saturating_add(amount);
        Ok(())
    }

    /// Subtract `amount` from a simple unit's counter (saturating).
    pub fn decrement_counter(&mut self, name: &str, amount: i64) -> Result<(), UnitError> {
        let counter = self.counter_mut(name)?;
        *counter = counter.saturating_sub(amount);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Remove every unit and counter.
    pub fn clear(&mut self) {
        self.units.clear();
        self.order.clear();
        self.counters.clear();
    }

    /// Set every unit to its minimum, zero every counter, and release every
    /// complex latch.
    pub fn reset_to_min(&mut self) {
        for unit in self.units.values_mut() {
            unit.value = unit.min;
            release_latch(unit);
        }
        self.zero_counters();
    }

    /// Set every unit value and counter to zero and release every complex
    /// latch.
    pub fn reset_to_zero(&mut self) {
        for unit in self.units.values_mut() {
            unit.value = 0;
            release_latch(unit);
        }
        self.zero_counters();
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn insert(&mut self, unit: TimeUnit) {
        if !self.units.contains_key(&unit.name) {
            self.order.push(unit.name.clone());
        }
        self.units.insert(unit.name.clone(), unit);
    }

    fn unit_mut(&mut self, name: &str) -> Result<&mut TimeUnit, UnitError> {
        self.units.get_mut(name).ok_or_else(|| reject(unknown(name)))
    }

    fn counter_mut(&mut self, name: &str) -> Result<&mut i64, UnitError> {
        if self.unit_mut(name)?.is_complex() {
            return Err(reject(UnitError::NotSimple {
                name: name.to_owned(),
            }));
        }
        Ok(self.counters.entry(name.to_owned()).or_insert(0))
    }

    fn zero_counters(&mut self) {
        for counter in self.counters.values_mut() {
            *counter = 0;
        }
    }

    /// Tracked references that resolve to nothing, logged once here.
    fn unresolved(&self, unit: &TimeUnit) -> Vec<Diagnostic> {
        unit.references()
            .into_iter()
            .filter(|reference| {
                *reference != ROOT_TICK && *reference != unit.name && !self.contains(reference)
            })
            .map(|reference| {
                warn!(
                    unit = %unit.name,
                    reference,
                    "Tracked unit not yet registered; trigger will not fire until it is"
                );
                Diagnostic::UnknownUnit {
                    unit: unit.name.clone(),
                    reference: reference.to_owned(),
                }
            })
            .collect()
    }
}

fn release_latch(unit: &mut TimeUnit) {
    if let UnitKind::Complex { triggered, .. } = &mut unit.kind {
        *triggered = false;
    }
}

fn unknown(name: &str) -> UnitError {
    UnitError::UnknownUnit {
        name: name.to_owned(),
    }
}

/// Log a rejected configuration call and hand the error back.
fn reject(err: UnitError) -> UnitError {
    error!(error = %err, "Time unit configuration rejected");
    err
}

fn validate_name(name: &str) -> Result<(), UnitError> {
    if name.is_empty() {
        return Err(reject(UnitError::EmptyName));
    }
    if name == ROOT_TICK {
        return Err(reject(UnitError::ReservedName {
            name: name.to_owned(),
        }));
    }
    Ok(())
}

fn validate_range(name: &str, min: i64, max: i64) -> Result<(), UnitError> {
    if max > 0 && max <= min {
        return Err(reject(UnitError::InvalidRange {
            name: name.to_owned(),
            min,
            max,
        }));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::unit::UNBOUNDED;

    fn calendar() -> UnitStore {
        let mut store = UnitStore::new();
        store.register_simple("second", "tick", 1, 60, 0).unwrap();
        store.register_simple("minute", "second", 60, 60, 0).unwrap();
        store.register_simple("hour", "minute", 60, 24, 0).unwrap();
        store.register_simple("day", "hour", 24, UNBOUNDED, 1).unwrap();
        store
    }

    #[test]
    fn names_follow_registration_order() {
        let store = calendar();
        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec!["second", "minute", "hour", "day"]);
    }

    #[test]
    fn reregistering_replaces_in_place_and_resets_counter() {
        let mut store = calendar();
        store.set_counter("minute", 30).unwrap();
        store.set_step("minute", 5).unwrap();
        store.register_simple("minute", "tick", 10, UNBOUNDED, 0).unwrap();

        assert_eq!(store.counter("minute"), 0);
        assert_eq!(store.step("minute"), 1);
        assert_eq!(store.tracked_unit("minute"), Some("tick"));
        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec!["second", "minute", "hour", "day"]);
    }

    #[test]
    fn rejects_bad_registrations_without_mutation() {
        let mut store = calendar();
        let before = store.clone();

        assert_eq!(
            store.register_simple("", "tick", 1, UNBOUNDED, 0),
            Err(UnitError::EmptyName)
        );
        assert!(matches!(
            store.register_simple("tick", "second", 1, UNBOUNDED, 0),
            Err(UnitError::ReservedName { .. })
        ));
        assert!(matches!(
            store.register_simple("week", "day", 0, UNBOUNDED, 0),
            Err(UnitError::InvalidTriggerCount { trigger_count: 0, .. })
        ));
        assert!(matches!(
            store.register_simple("week", "day", 7, 5, 5),
            Err(UnitError::InvalidRange { .. })
        ));
        assert!(matches!(
            store.register_complex("season", BTreeMap::new(), 4, 0),
            Err(UnitError::EmptyTrackedUnits { .. })
        ));
        let negative: BTreeMap<String, i64> = [("day".to_owned(), -1)].into_iter().collect();
        assert!(matches!(
            store.register_complex("season", negative, 4, 0),
            Err(UnitError::InvalidThreshold { threshold: -1, .. })
        ));
        let zero: BTreeMap<String, i64> = [("tick".to_owned(), 0)].into_iter().collect();
        assert!(matches!(
            store.register_complex("dawn", zero, UNBOUNDED, 0),
            Err(UnitError::InvalidThreshold { threshold: 0, .. })
        ));

        assert_eq!(store, before);
    }

    #[test]
    fn unknown_reference_is_reported_not_rejected() {
        let mut store = UnitStore::new();
        let diagnostics = store.register_simple("lap", "race", 3, UNBOUNDED, 0).unwrap();
        assert_eq!(
            diagnostics,
            vec![Diagnostic::UnknownUnit {
                unit: "lap".to_owned(),
                reference: "race".to_owned(),
            }]
        );
        assert!(store.contains("lap"));

        let diagnostics = store.register_simple("race", "tick", 1, UNBOUNDED, 0).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn getters_on_unknown_return_zero_values() {
        let store = calendar();
        assert_eq!(store.value("fortnight"), 0);
        assert_eq!(store.step("fortnight"), 0);
        assert_eq!(store.trigger_count("fortnight"), Ok(0));
        assert_eq!(store.min_value("fortnight"), 0);
        assert_eq!(store.max_value("fortnight"), 0);
        assert_eq!(store.tracked_unit("fortnight"), None);
        assert!(store.tracked_units("fortnight").is_none());
        assert!(!store.is_complex("fortnight"));
        assert_eq!(store.counter("fortnight"), 0);
    }

    #[test]
    fn setters_on_unknown_fail() {
        let mut store = calendar();
        assert!(matches!(
            store.set_value("fortnight", 3),
            Err(UnitError::UnknownUnit { .. })
        ));
        assert!(store.set_step("fortnight", 3).is_err());
        assert!(store.set_min_value("fortnight", 3).is_err());
        assert!(store.unregister("fortnight").is_err());
        assert!(!store.contains("fortnight"));
    }

    #[test]
    fn trigger_count_is_simple_only() {
        let mut store = calendar();
        let thresholds: BTreeMap<String, i64> = [("day".to_owned(), 2)].into_iter().collect();
        store.register_complex("payday", thresholds, UNBOUNDED, 0).unwrap();

        assert!(matches!(
            store.trigger_count("payday"),
            Err(UnitError::ComplexTriggerCount { .. })
        ));
        assert!(matches!(
            store.set_trigger_count("payday", 3),
            Err(UnitError::ComplexTriggerCount { .. })
        ));
        store.set_trigger_count("hour", 30).unwrap();
        assert_eq!(store.trigger_count("hour"), Ok(30));
        assert!(store.set_trigger_count("hour", -2).is_err());
        assert_eq!(store.trigger_count("hour"), Ok(30));
    }

    #[test]
    fn set_value_wraps_bounded_units() {
        let mut store = calendar();
        store.set_value("hour", 25).unwrap();
        assert_eq!(store.value("hour"), 1);
        store.set_value("day", 400).unwrap();
        assert_eq!(store.value("day"), 400);
    }

    #[test]
    fn set_min_value_validates_range() {
        let mut store = calendar();
        assert!(store.set_min_value("hour", 24).is_err());
        assert_eq!(store.min_value("hour"), 0);
        store.set_min_value("hour", 1).unwrap();
        assert_eq!(store.min_value("hour"), 1);
    }

    #[test]
    fn set_min_value_wraps_current_value_into_range() {
        let mut store = calendar();
        assert_eq!(store.value("hour"), 0);
        store.set_min_value("hour", 5).unwrap();
        // [5, 24) has range 19: 0 wraps to 19.
        assert_eq!(store.value("hour"), 19);
        assert!((5..24).contains(&store.value("hour")));

        store.set_value("hour", 7).unwrap();
        store.set_min_value("hour", 2).unwrap();
        assert_eq!(store.value("hour"), 7);
    }

    #[test]
    fn counter_accessors() {
        let mut store = calendar();
        store.increment_counter("minute", 45).unwrap();
        store.decrement_counter("minute", 5).unwrap();
        assert_eq!(store.counter("minute"), 40);
        store.set_counter("minute", i64::MAX).unwrap();
        store.increment_counter("minute", 1).unwrap();
        assert_eq!(store.counter("minute"), i64::MAX);
    }

    #[test]
    fn counters_reject_unknown_names() {
        let mut store = UnitStore::new();
        assert!(matches!(
            store.set_counter("ghost", 5),
            Err(UnitError::UnknownUnit { .. })
        ));
        assert!(store.increment_counter("phantom", 3).is_err());
        assert!(store.decrement_counter("phantom", 3).is_err());
        assert!(store.counters().is_empty());
    }

    #[test]
    fn complex_units_keep_no_counter() {
        let mut store = calendar();
        let thresholds: BTreeMap<String, i64> = [("hour".to_owned(), 6)].into_iter().collect();
        store.register_complex("alarm", thresholds, UNBOUNDED, 0).unwrap();

        assert!(matches!(
            store.set_counter("alarm", 1),
            Err(UnitError::NotSimple { .. })
        ));
        assert!(store.increment_counter("alarm", 1).is_err());
        assert!(!store.counters().contains_key("alarm"));
    }

    #[test]
    fn resets_and_clear() {
        let mut store = calendar();
        store.set_value("hour", 12).unwrap();
        store.set_value("day", 9).unwrap();
        store.set_counter("hour", 17).unwrap();

        store.reset_to_min();
        assert_eq!(store.value("hour"), 0);
        assert_eq!(store.value("day"), 1);
        assert_eq!(store.counter("hour"), 0);

        store.reset_to_zero();
        assert_eq!(store.value("day"), 0);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.names().count(), 0);
    }

    #[test]
    fn unregister_removes_unit_and_counter() {
        let mut store = calendar();
        let removed = store.unregister("minute").unwrap();
        assert_eq!(removed.name, "minute");
        assert!(!store.contains("minute"));
        assert!(!store.counters().contains_key("minute"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn rearm_units_only_for_complex() {
        let mut store = calendar();
        let thresholds: BTreeMap<String, i64> =
            [("hour".to_owned(), 6), ("minute".to_owned(), 30)].into_iter().collect();
        store.register_complex("alarm", thresholds, UNBOUNDED, 0).unwrap();

        let custom: BTreeSet<String> = ["minute".to_owned()].into_iter().collect();
        store.set_rearm_units("alarm", custom).unwrap();
        assert!(matches!(
            store.get("alarm").map(|unit| &unit.kind),
            Some(UnitKind::Complex { rearm_on, .. }) if rearm_on.contains("minute") && rearm_on.len() == 1
        ));
        assert!(matches!(
            store.set_rearm_units("hour", BTreeSet::new()),
            Err(UnitError::NotComplex { .. })
        ));
    }
}
