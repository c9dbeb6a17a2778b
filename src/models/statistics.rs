//! Read-only progress statistics over a store snapshot.
use super::ProgressRecord;
use super::sm2::is_due;
use crate::config::MasteryConfig;
use crate::storage::ProgressStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_items: usize,
    pub new_items: usize,
    pub mastered: usize,
    pub learning: usize,
    pub due: usize,
    pub accuracy: Option<f64>,
}

pub fn is_mastered(record: &ProgressRecord, mastery: &MasteryConfig) -> bool {
    record.repetitions >= mastery.mastery_threshold
        && record.interval_days >= mastery.mastery_interval_floor_days
}

pub fn mastered_count(store: &ProgressStore, mastery: &MasteryConfig) -> usize {
    store
        .iter()
        .filter(|(_, record)| is_mastered(record, mastery))
        .count()
}

/// Reviewed at least once but not mastered yet.
pub fn learning_count(store: &ProgressStore, mastery: &MasteryConfig) -> usize {
    store
        .iter()
        .filter(|(_, record)| !record.is_new() && !is_mastered(record, mastery))
        .count()
}

pub fn new_count(store: &ProgressStore) -> usize {
    store.iter().filter(|(_, record)| record.is_new()).count()
}

pub fn due_count(store: &ProgressStore, now: DateTime<Utc>) -> usize {
    store.iter().filter(|(_, record)| is_due(record, now)).count()
}

/// Lifetime share of correct ratings, `None` when nothing was reviewed.
pub fn overall_accuracy(store: &ProgressStore) -> Option<f64> {
    let (correct, incorrect) = store.iter().fold((0u64, 0u64), |(c, i), (_, record)| {
        (
            c + u64::from(record.correct_count),
            i + u64::from(record.incorrect_count),
        )
    });
    let total = correct + incorrect;
    (total > 0).then(|| correct as f64 / total as f64)
}

pub fn summarize(store: &ProgressStore, now: DateTime<Utc>, mastery: &MasteryConfig) -> ProgressSummary {
    ProgressSummary {
        total_items: store.len(),
        new_items: new_count(store),
        mastered: mastered_count(store, mastery),
        learning: learning_count(store, mastery),
        due: due_count(store, now),
        accuracy: overall_accuracy(store),
    }
}
