//! TOML-based configuration.
//!
//! Holds every tunable of the scheduler:
//! - interval and ease constants used when a rating is applied
//! - per-session options (show first, shuffle, repeat incorrect, limits)
//! - the thresholds that make an item count as mastered
//! - where the progress document lives
//!
//! Every key is optional; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SchedulerError};
use crate::models::Side;

/// Constants used by `Scheduler::apply_rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub ease_floor: f64,
    pub again_ease_penalty: f64,
    pub hard_ease_penalty: f64,
    pub good_ease_bonus: f64,
    pub easy_ease_bonus: f64,
    /// Interval after a lapse, in days. Also the floor of every interval.
    pub minimum_interval_days: f64,
    /// Interval after the first successful review, in days.
    pub graduation_interval_days: f64,
    /// Scales what `Good` would have produced; must be below 1.
    pub hard_multiplier: f64,
    pub easy_multiplier: f64,
    pub maximum_interval_days: f64,
}

/// When an item counts as mastered in statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryConfig {
    pub mastery_threshold: u32,
    pub mastery_interval_floor_days: f64,
}

/// Options fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub show_first: Side,
    pub shuffle: bool,
    pub repeat_incorrect: bool,
    pub max_items: Option<usize>,
    /// `false` restricts the session to items reviewed at least once.
    pub include_new: bool,
    /// Fixes the shuffle order.
    pub seed: Option<u64>,
}

/// Application configuration, usually read from `flashcards.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub mastery: MasteryConfig,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("flashcard_progress.json")
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            ease_floor: 1.3,
            again_ease_penalty: 0.2,
            hard_ease_penalty: 0.15,
            good_ease_bonus: 0.0,
            easy_ease_bonus: 0.15,
            minimum_interval_days: 10.0 / 1440.0,
            graduation_interval_days: 1.0,
            hard_multiplier: 0.6,
            easy_multiplier: 1.3,
            maximum_interval_days: 36_500.0,
        }
    }
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: 3,
            mastery_interval_floor_days: 21.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            show_first: Side::Word,
            shuffle: false,
            repeat_incorrect: true,
            max_items: None,
            include_new: true,
            seed: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            scheduler: SchedulerConfig::default(),
            session: SessionConfig::default(),
            mastery: MasteryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Rejects constants that would break the scheduler's guarantees
    /// (finite values, ease floor, Easy >= Good >= Hard >= Again).
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("initial_ease", self.initial_ease),
            ("ease_floor", self.ease_floor),
            ("again_ease_penalty", self.again_ease_penalty),
            ("hard_ease_penalty", self.hard_ease_penalty),
            ("good_ease_bonus", self.good_ease_bonus),
            ("easy_ease_bonus", self.easy_ease_bonus),
            ("minimum_interval_days", self.minimum_interval_days),
            ("graduation_interval_days", self.graduation_interval_days),
            ("hard_multiplier", self.hard_multiplier),
            ("easy_multiplier", self.easy_multiplier),
            ("maximum_interval_days", self.maximum_interval_days),
        ];
        for (key, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, "must be a finite, non-negative number"));
            }
        }

        if self.ease_floor <= 0.0 {
            return Err(invalid("ease_floor", "must be greater than 0"));
        }
        if self.hard_multiplier >= 1.0 {
            return Err(invalid("hard_multiplier", "must be below 1"));
        }
        if self.easy_multiplier < 1.0 {
            return Err(invalid("easy_multiplier", "must be at least 1"));
        }
        if self.easy_ease_bonus < self.good_ease_bonus {
            return Err(invalid("easy_ease_bonus", "must not be below good_ease_bonus"));
        }
        if self.minimum_interval_days > self.graduation_interval_days {
            return Err(invalid(
                "minimum_interval_days",
                "must not exceed graduation_interval_days",
            ));
        }
        if self.maximum_interval_days < self.graduation_interval_days {
            return Err(invalid(
                "maximum_interval_days",
                "must not be below graduation_interval_days",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> SchedulerError {
    SchedulerError::Config(format!("{key} {message}"))
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: AppConfig =
            toml::from_str(content).map_err(|e| SchedulerError::Config(e.to_string()))?;
        cfg.scheduler.validate()?;
        Ok(cfg)
    }

    /// Load from disk, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the scheduler constants are inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(SchedulerError::io(path, e)),
        }
    }
}
