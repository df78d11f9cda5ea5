//! Configuration loading and typed config structures for the TimeTick engine.
//!
//! The canonical configuration lives in `timetick-config.yaml` at the project
//! root. It sets the driver's timing parameters, lists the unit hierarchy in
//! registration order, and tunes the host frame loop.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::driver::TickDriver;
use crate::error::UnitError;
use crate::unit::{ROOT_TICK, UNBOUNDED};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A unit entry was rejected by the registry.
    #[error("invalid unit definition: {source}")]
    Unit {
        /// The registry's rejection.
        #[from]
        source: UnitError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `timetick-config.yaml`. Every section is
/// optional; an empty document yields the default calendar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeTickConfig {
    /// Root tick timing.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Unit hierarchy, registered in list order.
    #[serde(default = "default_units")]
    pub units: Vec<UnitConfig>,

    /// Host frame loop settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for TimeTickConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            units: default_units(),
            engine: EngineConfig::default(),
        }
    }
}

impl TimeTickConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Build a driver with every configured unit registered in file order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unit`] for the first unit entry the registry
    /// rejects.
    pub fn build_driver(&self) -> Result<TickDriver, ConfigError> {
        let mut driver = TickDriver::new(self.driver.tick_duration);
        driver.set_time_scale(self.driver.time_scale);

        for unit in &self.units {
            unit.register(&mut driver)?;
        }
        if self.driver.start_paused {
            driver.pause();
        }
        debug!(units = self.units.len(), "Built tick driver from config");
        Ok(driver)
    }
}

/// Root tick timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriverConfig {
    /// Elapsed time per root tick.
    #[serde(default = "default_tick_duration")]
    pub tick_duration: f64,

    /// Multiplier applied to elapsed time. Negative runs backwards.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Whether the driver starts paused.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_duration: default_tick_duration(),
            time_scale: default_time_scale(),
            start_paused: false,
        }
    }
}

/// One unit in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitConfig {
    /// Registry key.
    pub name: String,

    /// Trigger rule.
    #[serde(flatten)]
    pub rule: UnitRule,

    /// Amount added per trigger.
    #[serde(default = "default_step")]
    pub step: i64,

    /// Exclusive upper bound; `-1` or `0` for unbounded.
    #[serde(default = "default_max")]
    pub max: i64,

    /// Inclusive lower bound and starting value.
    #[serde(default)]
    pub min: i64,

    /// Starting value if different from `min`.
    #[serde(default)]
    pub start: Option<i64>,
}

/// Trigger rule of a configured unit, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitRule {
    /// Fires every `trigger_count` steps of one parent.
    Simple {
        /// Parent unit name, or `tick`.
        #[serde(default = "default_tracks")]
        tracks: String,
        /// Parent steps per firing.
        trigger_count: i64,
    },

    /// Fires once when every tracked unit reaches its threshold.
    Complex {
        /// Tracked unit to threshold.
        tracks: BTreeMap<String, i64>,
        /// Tracked units whose drop re-arms the trigger. Empty for the
        /// high-order default.
        #[serde(default)]
        rearm_on: BTreeSet<String>,
    },
}

impl UnitConfig {
    fn register(&self, driver: &mut TickDriver) -> Result<(), UnitError> {
        let store = driver.units_mut();
        match &self.rule {
            UnitRule::Simple {
                tracks,
                trigger_count,
            } => {
                store.register_simple(&self.name, tracks, *trigger_count, self.max, self.min)?;
            }
            UnitRule::Complex { tracks, rearm_on } => {
                store.register_complex(&self.name, tracks.clone(), self.max, self.min)?;
                if !rearm_on.is_empty() {
                    store.set_rearm_units(&self.name, rearm_on.clone())?;
                }
            }
        }
        if self.step != default_step() {
            store.set_step(&self.name, self.step)?;
        }
        if let Some(start) = self.start {
            store.set_value(&self.name, start)?;
        }
        Ok(())
    }
}

/// Host frame loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds between frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Stop after this many root ticks. Runs until interrupted when unset.
    #[serde(default)]
    pub max_ticks: Option<u64>,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `{unit}` template logged whenever the root tick advances.
    #[serde(default)]
    pub status_template: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            max_ticks: None,
            log_level: default_log_level(),
            status_template: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tick_duration() -> f64 {
    1.0
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_step() -> i64 {
    1
}

const fn default_max() -> i64 {
    UNBOUNDED
}

fn default_tracks() -> String {
    ROOT_TICK.to_owned()
}

const fn default_frame_interval_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn simple(name: &str, tracks: &str, trigger_count: i64, max: i64, min: i64) -> UnitConfig {
    UnitConfig {
        name: name.to_owned(),
        rule: UnitRule::Simple {
            tracks: tracks.to_owned(),
            trigger_count,
        },
        step: default_step(),
        max,
        min,
        start: None,
    }
}

/// Seconds-based calendar: 60 s minutes, 24 h days, 30 day months,
/// 12 month years.
fn default_units() -> Vec<UnitConfig> {
    vec![
        simple("second", ROOT_TICK, 1, 60, 0),
        simple("minute", "second", 60, 60, 0),
        simple("hour", "minute", 60, 24, 0),
        simple("day", "hour", 24, 31, 1),
        simple("month", "day", 30, 13, 1),
        simple("year", "month", 12, UNBOUNDED, 1),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TimeTickConfig::default();
        assert_eq!(config.driver.tick_duration, 1.0);
        assert_eq!(config.units.len(), 6);
        assert_eq!(config.engine.frame_interval_ms, 100);
        assert!(config.engine.max_ticks.is_none());

        let driver = config.build_driver().unwrap();
        assert_eq!(driver.units().len(), 6);
        assert_eq!(driver.value("day"), 1);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = TimeTickConfig::parse("").unwrap();
        assert_eq!(config, TimeTickConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
driver:
  tick_duration: 0.5
  time_scale: 2.0
  start_paused: true

units:
  - name: minute
    kind: simple
    tracks: tick
    trigger_count: 60
    max: 60
  - name: hour
    kind: simple
    tracks: minute
    trigger_count: 60
    max: 24
    start: 6
  - name: day
    kind: simple
    tracks: hour
    trigger_count: 24
    min: 1
  - name: dawn
    kind: complex
    tracks:
      hour: 6
      day: 1
    rearm_on: [hour]

engine:
  frame_interval_ms: 16
  max_ticks: 1000
  log_level: debug
  status_template: "{hour}:{minute}"
"#;
        let config = TimeTickConfig::parse(yaml).unwrap();
        assert_eq!(config.driver.tick_duration, 0.5);
        assert!(config.driver.start_paused);
        assert_eq!(config.units.len(), 4);
        assert_eq!(config.engine.max_ticks, Some(1000));
        assert_eq!(config.engine.log_level, "debug");
        assert_eq!(config.engine.status_template.as_deref(), Some("{hour}:{minute}"));

        let dawn = config.units.get(3).unwrap();
        assert!(matches!(&dawn.rule, UnitRule::Complex { tracks, rearm_on }
            if tracks.get("hour") == Some(&6) && rearm_on.contains("hour")));

        let driver = config.build_driver().unwrap();
        assert!(driver.is_paused());
        assert_eq!(driver.time_scale(), 2.0);
        assert_eq!(driver.value("hour"), 6);
        assert_eq!(driver.value("day"), 1);
        assert!(driver.units().is_complex("dawn"));
        assert_eq!(
            driver.units().names().collect::<Vec<_>>(),
            vec!["minute", "hour", "day", "dawn"]
        );
    }

    #[test]
    fn step_overrides_apply() {
        let yaml = r"
units:
  - name: quarter
    kind: simple
    trigger_count: 3
    step: 15
    max: 60
";
        let driver = TimeTickConfig::parse(yaml).unwrap().build_driver().unwrap();
        assert_eq!(driver.units().step("quarter"), 15);
        assert_eq!(driver.units().tracked_unit("quarter"), Some(ROOT_TICK));
    }

    #[test]
    fn rejected_unit_surfaces_as_config_error() {
        let yaml = r"
units:
  - name: broken
    kind: simple
    tracks: tick
    trigger_count: 0
";
        let result = TimeTickConfig::parse(yaml).unwrap().build_driver();
        assert!(matches!(
            result,
            Err(ConfigError::Unit {
                source: UnitError::InvalidTriggerCount { .. }
            })
        ));
    }

    #[test]
    fn missing_kind_is_a_yaml_error() {
        let yaml = r"
units:
  - name: orphan
    tracks: tick
    trigger_count: 10
";
        assert!(matches!(TimeTickConfig::parse(yaml), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = TimeTickConfig::from_file(Path::new("/nonexistent/timetick-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
