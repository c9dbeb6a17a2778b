use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Long-term review state of one item.
///
/// Only the scheduler's rating step changes a record after creation. Fields
/// this version does not know about are carried in `extra` so a newer
/// document survives a load/save cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub repetitions: u32,
    pub interval_days: f64,
    pub ease_factor: f64,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub streak: u32,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProgressRecord {
    pub fn new(now: DateTime<Utc>, initial_ease: f64) -> Self {
        Self {
            repetitions: 0,
            interval_days: 0.0,
            ease_factor: initial_ease,
            due_at: now,
            last_reviewed_at: None,
            correct_count: 0,
            incorrect_count: 0,
            streak: 0,
            created_at: now,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    pub fn attempts(&self) -> u32 {
        self.correct_count.saturating_add(self.incorrect_count)
    }
}
