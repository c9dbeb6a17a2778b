//! SM-2 style spaced repetition scheduling.
//!
//! The scheduler turns a four-level rating into the next review state:
//! - `Again` is a lapse: repetitions and streak reset, the interval drops to
//!   the minimum and the ease factor takes the full penalty
//! - `Hard` keeps progressing but at a fraction of what `Good` would give
//! - `Good` graduates new items to the graduation interval, then grows the
//!   interval by the ease factor
//! - `Easy` graduates immediately and adds a bonus on top of `Good`
//!
//! Every constant comes from `SchedulerConfig`. The functions here are pure
//! and total: any record, rating and timestamp yields a next record.

use super::{ItemId, ProgressRecord, Rating};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::storage::ProgressStore;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Whether never-reviewed items take part in a due query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DueMode {
    #[default]
    IncludeNew,
    ReviewOnly,
}

/// True for never-reviewed items and for items whose due time has arrived.
pub fn is_due(record: &ProgressRecord, now: DateTime<Utc>) -> bool {
    record.last_reviewed_at.is_none() || now >= record.due_at
}

/// Converts a fractional day count to a duration, rounded to milliseconds.
pub fn interval_to_duration(days: f64) -> Duration {
    let millis = (days * MILLIS_PER_DAY).round();
    if !millis.is_finite() {
        return Duration::MAX;
    }
    Duration::try_milliseconds(millis as i64).unwrap_or(Duration::MAX)
}

#[derive(Clone, Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// A fresh record for an item seen for the first time.
    pub fn new_record(&self, now: DateTime<Utc>) -> ProgressRecord {
        ProgressRecord::new(now, self.config.initial_ease)
    }

    /// Calculates the record that results from rating `record` at `now`.
    pub fn apply_rating(
        &self,
        record: &ProgressRecord,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> ProgressRecord {
        let cfg = &self.config;
        let interval = sanitize_interval(record.interval_days);
        let ease = self.sanitize_ease(record.ease_factor);

        let (repetitions, new_ease, new_interval) = match rating {
            Rating::Again => (0, ease - cfg.again_ease_penalty, cfg.minimum_interval_days),
            Rating::Hard => {
                let reps = record.repetitions.saturating_add(1);
                // What Good would have produced, shortened
                let good = self.good_interval(reps, interval, ease + cfg.good_ease_bonus);
                (reps, ease - cfg.hard_ease_penalty, good * cfg.hard_multiplier)
            }
            Rating::Good => {
                let reps = record.repetitions.saturating_add(1);
                let new_ease = ease + cfg.good_ease_bonus;
                (reps, new_ease, self.good_interval(reps, interval, new_ease))
            }
            Rating::Easy => {
                let reps = record.repetitions.saturating_add(1).max(2);
                let new_ease = ease + cfg.easy_ease_bonus;
                let grown = (interval * new_ease).max(cfg.graduation_interval_days);
                (reps, new_ease, grown * cfg.easy_multiplier)
            }
        };

        let interval_days = self.clamp_interval(new_interval);
        let mut next = record.clone();
        next.repetitions = repetitions;
        next.ease_factor = new_ease.max(cfg.ease_floor);
        next.interval_days = interval_days;
        next.last_reviewed_at = Some(now);
        next.due_at = now
            .checked_add_signed(interval_to_duration(interval_days))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if rating.is_correct() {
            next.correct_count = record.correct_count.saturating_add(1);
            next.streak = record.streak.saturating_add(1);
        } else {
            next.incorrect_count = record.incorrect_count.saturating_add(1);
            next.streak = 0;
        }

        log::debug!(
            "rated {rating}: interval {:.3}d -> {:.3}d, ease {:.2} -> {:.2}",
            record.interval_days,
            next.interval_days,
            record.ease_factor,
            next.ease_factor
        );
        next
    }

    /// Due items, most overdue first; never-reviewed items lead, ties are
    /// broken by ascending id.
    pub fn due_items(&self, store: &ProgressStore, now: DateTime<Utc>, mode: DueMode) -> Vec<ItemId> {
        let mut due: Vec<(&ItemId, Option<DateTime<Utc>>)> = store
            .iter()
            .filter(|(_, record)| is_due(record, now))
            .filter(|(_, record)| mode == DueMode::IncludeNew || !record.is_new())
            .map(|(id, record)| {
                let key = if record.is_new() { None } else { Some(record.due_at) };
                (id, key)
            })
            .collect();

        due.sort_by(|a, b| match a.1.cmp(&b.1) {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        });
        due.into_iter().map(|(id, _)| id.clone()).collect()
    }

    fn good_interval(&self, repetitions: u32, interval: f64, ease: f64) -> f64 {
        if repetitions <= 1 {
            self.config.graduation_interval_days
        } else {
            (interval * ease).max(self.config.graduation_interval_days)
        }
    }

    fn sanitize_ease(&self, ease: f64) -> f64 {
        if ease.is_finite() {
            ease.max(self.config.ease_floor)
        } else {
            self.config.initial_ease
        }
    }

    fn clamp_interval(&self, days: f64) -> f64 {
        if days.is_nan() {
            return self.config.minimum_interval_days;
        }
        days.max(self.config.minimum_interval_days)
            .min(self.config.maximum_interval_days)
    }
}

fn sanitize_interval(days: f64) -> f64 {
    if days.is_finite() && days > 0.0 { days } else { 0.0 }
}
