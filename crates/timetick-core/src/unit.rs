//! Time unit records.
//!
//! A [`TimeUnit`] holds the fields every unit shares (value, step, bounds)
//! and a [`UnitKind`] describing what makes it fire:
//!
//! - [`UnitKind::Simple`] counts steps of exactly one parent and fires every
//!   `trigger_count` accumulated parent steps.
//! - [`UnitKind::Complex`] fires once when every tracked unit has reached its
//!   threshold, then stays latched until a high-order tracked unit drops
//!   back below its threshold.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Name of the externally driven root tick. Addressable as a parent but
/// never stored in the registry.
pub const ROOT_TICK: &str = "tick";

/// Sentinel `max` value meaning "no upper bound, never wraps".
pub const UNBOUNDED: i64 = -1;

/// Tracked units treated as high-order by default when a complex unit is
/// registered. These change infrequently, so falling below a threshold
/// signals that the larger cycle has wrapped.
pub const DEFAULT_HIGH_ORDER_UNITS: [&str; 4] = ["hour", "day", "month", "year"];

/// A registered time unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnit {
    /// Unique registry key.
    pub name: String,
    /// Current visible value.
    pub value: i64,
    /// Amount added on each forward trigger (subtracted in reverse).
    pub step: i64,
    /// Inclusive lower bound of the wrap range.
    pub min: i64,
    /// Exclusive upper bound of the wrap range; `<= 0` means unbounded.
    pub max: i64,
    /// Trigger rule.
    pub kind: UnitKind,
}

/// What makes a unit fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitKind {
    /// Counts accumulated steps of a single parent.
    Simple {
        /// Parent unit name (or [`ROOT_TICK`]).
        tracked: String,
        /// Parent steps needed per firing. Always positive.
        trigger_count: i64,
    },

    /// Fires once when every tracked unit meets its threshold.
    Complex {
        /// Tracked unit name to minimum required value.
        thresholds: BTreeMap<String, i64>,
        /// Tracked units whose drop below threshold re-arms the trigger.
        rearm_on: BTreeSet<String>,
        /// Whether the all-conditions-met edge has already fired.
        triggered: bool,
    },
}

impl TimeUnit {
    /// Create a simple unit starting at `min`, stepping by 1.
    pub fn simple(
        name: impl Into<String>,
        tracked: impl Into<String>,
        trigger_count: i64,
        max: i64,
        min: i64,
    ) -> Self {
        Self {
            name: name.into(),
            value: min,
            step: 1,
            min,
            max,
            kind: UnitKind::Simple {
                tracked: tracked.into(),
                trigger_count,
            },
        }
    }

    /// Create a complex unit starting at `min`, stepping by 1, with the
    /// default high-order re-arm set.
    pub fn complex(
        name: impl Into<String>,
        thresholds: BTreeMap<String, i64>,
        max: i64,
        min: i64,
    ) -> Self {
        let rearm_on = default_rearm_units(&thresholds);
        Self {
            name: name.into(),
            value: min,
            step: 1,
            min,
            max,
            kind: UnitKind::Complex {
                thresholds,
                rearm_on,
                triggered: false,
            },
        }
    }

    /// Whether the unit wraps within `[min, max)`.
    pub const fn is_bounded(&self) -> bool {
        self.max > 0
    }

    /// Whether the unit is a [`UnitKind::Complex`] unit.
    pub const fn is_complex(&self) -> bool {
        matches!(self.kind, UnitKind::Complex { .. })
    }

    /// Whether a change of `parent` can make this unit fire.
    pub fn depends_on(&self, parent: &str) -> bool {
        match &self.kind {
            UnitKind::Simple { tracked, .. } => tracked == parent,
            UnitKind::Complex { thresholds, .. } => thresholds.contains_key(parent),
        }
    }

    /// Names of every unit this unit tracks.
    pub fn references(&self) -> Vec<&str> {
        match &self.kind {
            UnitKind::Simple { tracked, .. } => vec![tracked.as_str()],
            UnitKind::Complex { thresholds, .. } => thresholds.keys().map(String::as_str).collect(),
        }
    }
}

/// High-order re-arm set for a threshold map.
///
/// Tracked keys among [`DEFAULT_HIGH_ORDER_UNITS`]; if none are tracked,
/// every key counts as high-order.
pub fn default_rearm_units(thresholds: &BTreeMap<String, i64>) -> BTreeSet<String> {
    let conventional: BTreeSet<String> = thresholds
        .keys()
        .filter(|key| DEFAULT_HIGH_ORDER_UNITS.contains(&key.as_str()))
        .cloned()
        .collect();
    if conventional.is_empty() {
        thresholds.keys().cloned().collect()
    } else {
        conventional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect()
    }

    #[test]
    fn simple_unit_starts_at_min() {
        let unit = TimeUnit::simple("day", "hour", 24, UNBOUNDED, 1);
        assert_eq!(unit.value, 1);
        assert_eq!(unit.step, 1);
        assert!(!unit.is_bounded());
        assert!(unit.depends_on("hour"));
        assert!(!unit.depends_on("minute"));
    }

    #[test]
    fn rearm_defaults_to_conventional_high_order_units() {
        let unit = TimeUnit::complex("season", thresholds(&[("month", 3), ("minute", 1)]), 4, 0);
        assert!(unit.is_complex());
        assert!(matches!(
            &unit.kind,
            UnitKind::Complex { rearm_on, .. }
                if rearm_on.contains("month") && !rearm_on.contains("minute")
        ));
    }

    #[test]
    fn rearm_falls_back_to_all_tracked_units() {
        let set = default_rearm_units(&thresholds(&[("wave", 2), ("tick", 10)]));
        assert_eq!(set.len(), 2);
        assert!(set.contains("wave"));
        assert!(set.contains("tick"));
    }
}
