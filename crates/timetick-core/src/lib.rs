//! Unit registry, cascade propagation, and tick driver for the TimeTick engine.
//!
//! A single root tick drives a forest of derived counters ("time units").
//! Each unit fires when a trigger condition on its parent(s) is satisfied,
//! steps its value, wraps into its configured range, and cascades to its own
//! dependents. Calendars, clocks, and game-time systems are built by
//! registering rules rather than hard-coding units.
//!
//! # Modules
//!
//! - [`unit`] -- [`TimeUnit`] record and the [`UnitKind`] variants.
//! - [`store`] -- [`UnitStore`], the insertion-ordered unit registry and
//!   per-unit counters.
//! - [`wrap`] -- Min/max wraparound of candidate values.
//! - [`propagation`] -- The increment/decrement cascade over the registry.
//! - [`driver`] -- [`TickDriver`], which turns elapsed time into root ticks.
//! - [`event`] -- Change events and diagnostics returned from every call.
//! - [`config`] -- YAML configuration of the driver and unit hierarchy.
//! - [`format`] -- `{unit}` templating and padded formatting.
//! - [`snapshot`] -- Serializable capture of the full engine state.
//! - [`error`] -- Registry rejections.
//!
//! [`TimeUnit`]: unit::TimeUnit
//! [`UnitKind`]: unit::UnitKind
//! [`UnitStore`]: store::UnitStore
//! [`TickDriver`]: driver::TickDriver

pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod format;
pub mod propagation;
pub mod snapshot;
pub mod store;
pub mod unit;
pub mod wrap;

pub use config::{ConfigError, TimeTickConfig};
pub use driver::{DriverState, TickDriver};
pub use error::UnitError;
pub use event::{Diagnostic, TickReport, TimeEvent};
pub use snapshot::{Snapshot, SnapshotError};
pub use store::UnitStore;
pub use unit::{ROOT_TICK, TimeUnit, UNBOUNDED, UnitKind};
