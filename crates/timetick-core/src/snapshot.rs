//! Serializable capture of the full driver state.
//!
//! A [`Snapshot`] holds everything needed to resume a [`TickDriver`] exactly
//! where it stopped: root tick, partial-tick time, timing parameters, pause
//! state, and the unit registry in registration order with its counters.
//!
//! [`TickDriver`]: crate::driver::TickDriver

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::unit::TimeUnit;

/// Errors from encoding or decoding a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON encoding or decoding failed.
    #[error("snapshot JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

/// Point-in-time state of a tick driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Root tick count.
    pub tick: u64,
    /// Scaled time accumulated toward the next tick.
    pub accumulated: f64,
    /// Time per root tick.
    pub tick_duration: f64,
    /// Elapsed-time multiplier.
    pub time_scale: f64,
    /// Whether time input was being discarded.
    pub paused: bool,
    /// Registered units in registration order.
    pub units: Vec<TimeUnit>,
    /// Accumulated parent steps per simple unit.
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
}

impl Snapshot {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}
