//! Error types for the `timetick-core` crate.
//!
//! Every configuration call that can be rejected returns [`UnitError`]. A
//! rejected call leaves the registry untouched.

/// Configuration errors raised by registration and setter calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// A unit name was empty.
    #[error("unit name cannot be empty")]
    EmptyName,

    /// A unit name collides with the root tick pseudo-unit.
    #[error("unit name '{name}' is reserved for the root tick")]
    ReservedName {
        /// The rejected name.
        name: String,
    },

    /// The named unit is not registered.
    #[error("time unit '{name}' not found")]
    UnknownUnit {
        /// The name that was looked up.
        name: String,
    },

    /// A trigger count was zero or negative.
    #[error("trigger count for '{name}' must be positive, got {trigger_count}")]
    InvalidTriggerCount {
        /// The unit being configured.
        name: String,
        /// The rejected trigger count.
        trigger_count: i64,
    },

    /// A complex unit threshold was zero or negative.
    #[error("threshold for '{tracked}' in complex unit '{name}' must be positive, got {threshold}")]
    InvalidThreshold {
        /// The complex unit being configured.
        name: String,
        /// The tracked unit the threshold applies to.
        tracked: String,
        /// The rejected threshold.
        threshold: i64,
    },

    /// A complex unit was registered without any tracked units.
    #[error("complex time unit '{name}' must track at least one unit")]
    EmptyTrackedUnits {
        /// The complex unit being configured.
        name: String,
    },

    /// A bounded range was empty (`max <= min`).
    #[error("invalid range for '{name}': max {max} must be greater than min {min}")]
    InvalidRange {
        /// The unit being configured.
        name: String,
        /// The requested minimum.
        min: i64,
        /// The requested maximum.
        max: i64,
    },

    /// A trigger count was set on a complex unit.
    #[error("cannot set trigger_count for complex time unit '{name}'; use its tracked thresholds instead")]
    ComplexTriggerCount {
        /// The complex unit.
        name: String,
    },

    /// A complex-only operation was applied to a simple unit.
    #[error("time unit '{name}' is not a complex unit")]
    NotComplex {
        /// The simple unit.
        name: String,
    },

    /// A counter operation was applied to a complex unit.
    #[error("time unit '{name}' is complex and keeps no counter")]
    NotSimple {
        /// The complex unit.
        name: String,
    },
}
