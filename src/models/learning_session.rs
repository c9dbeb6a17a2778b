//! Learning session management for spaced repetition practice.
//! Builds the review queue for one sitting, applies ratings through the
//! scheduler and keeps the session-local counters.

use super::sm2::DueMode;
use super::{ItemId, Rating, Scheduler};
use crate::config::SessionConfig;
use crate::error::{Result, SchedulerError};
use crate::storage::{ProgressStore, SharedProgressStore};
use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// One rating given during the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub item_id: ItemId,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}

/// State of a single practice run. Never persisted; the ratings it applies
/// are written to the store as they happen.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub config: SessionConfig,
    pub queue: Vec<ItemId>,
    pub position: usize,
    pub correct_in_session: u32,
    pub incorrect_in_session: u32,
    pub current_streak: u32,
    pub started_at: DateTime<Utc>,
    pub log: Vec<ReviewEvent>,
    cancelled: bool,
}

impl SessionState {
    /// `None` once the queue is exhausted or the session was cancelled.
    pub fn current_item(&self) -> Option<&ItemId> {
        if self.cancelled {
            return None;
        }
        self.queue.get(self.position)
    }

    pub fn status(&self) -> SessionStatus {
        if self.cancelled {
            SessionStatus::Cancelled
        } else if self.position >= self.queue.len() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == SessionStatus::Completed
    }

    pub fn remaining(&self) -> usize {
        self.queue.len().saturating_sub(self.position)
    }

    pub fn reviewed_count(&self) -> u32 {
        self.correct_in_session + self.incorrect_in_session
    }

    /// Share of correct ratings, `None` before the first rating.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.reviewed_count();
        (total > 0).then(|| f64::from(self.correct_in_session) / f64::from(total))
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }

    pub fn progress_message(&self) -> String {
        match self.status() {
            SessionStatus::Active => format!("Card {}/{}", self.position + 1, self.queue.len()),
            SessionStatus::Completed => format!("Session complete: {} cards", self.queue.len()),
            SessionStatus::Cancelled => "Session cancelled".to_string(),
        }
    }
}

/// Drives sessions: queue building, rating and cancellation.
///
/// Operations take the session by reference and hand back a new state, so
/// the caller always renders from the value it just received.
#[derive(Clone, Debug, Default)]
pub struct SessionManager {
    scheduler: Scheduler,
}

impl SessionManager {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Builds the queue from due items that are part of the loaded
    /// vocabulary (`candidates`).
    ///
    /// # Errors
    ///
    /// `EmptySession` when nothing is due.
    pub fn start_session(
        &self,
        store: &mut ProgressStore,
        config: &SessionConfig,
        candidates: &[ItemId],
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        for id in candidates {
            store.get_or_insert_with(id, || self.scheduler.new_record(now));
        }

        let wanted: HashSet<&ItemId> = candidates.iter().collect();
        let mode = if config.include_new {
            DueMode::IncludeNew
        } else {
            DueMode::ReviewOnly
        };
        let mut queue: Vec<ItemId> = self
            .scheduler
            .due_items(store, now, mode)
            .into_iter()
            .filter(|id| wanted.contains(id))
            .collect();

        if config.shuffle {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            queue.shuffle(&mut rng);
        }
        if let Some(max_items) = config.max_items {
            queue.truncate(max_items);
        }

        if queue.is_empty() {
            log::info!("no due items among {} candidates", candidates.len());
            return Err(SchedulerError::EmptySession);
        }

        log::info!("session started with {} items", queue.len());
        Ok(SessionState {
            config: config.clone(),
            queue,
            position: 0,
            correct_in_session: 0,
            incorrect_in_session: 0,
            current_streak: 0,
            started_at: now,
            log: Vec::new(),
            cancelled: false,
        })
    }

    /// Rates the current item, persists the new record, then advances.
    ///
    /// # Errors
    ///
    /// `NoCurrentItem` when the session is exhausted or cancelled; any
    /// store error from persisting, in which case neither the store nor the
    /// session has changed.
    pub fn rate_current(
        &self,
        session: &SessionState,
        store: &mut ProgressStore,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        let Some(id) = session.current_item().cloned() else {
            return Err(SchedulerError::NoCurrentItem {
                position: session.position,
                len: session.queue.len(),
            });
        };

        let record = store
            .get_or_insert_with(&id, || self.scheduler.new_record(now))
            .clone();
        let next = self.scheduler.apply_rating(&record, rating, now);
        store.commit(id.clone(), next)?;

        let mut session = session.clone();
        if rating.is_correct() {
            session.correct_in_session = session.correct_in_session.saturating_add(1);
            session.current_streak = session.current_streak.saturating_add(1);
        } else {
            session.incorrect_in_session = session.incorrect_in_session.saturating_add(1);
            session.current_streak = 0;
        }

        if rating == Rating::Again && session.config.repeat_incorrect {
            session.queue.push(id.clone());
        }
        session.log.push(ReviewEvent {
            item_id: id,
            rating,
            reviewed_at: now,
        });
        session.position += 1;

        if session.is_completed() {
            log::info!(
                "session completed: {} correct, {} incorrect",
                session.correct_in_session,
                session.incorrect_in_session
            );
        }
        Ok(session)
    }

    /// `rate_current` against a shared store, holding its lock for the
    /// whole update.
    pub fn rate_current_shared(
        &self,
        session: &SessionState,
        store: &SharedProgressStore,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        store.with(|store| self.rate_current(session, store, rating, now))
    }

    /// Ends the session early. Ratings already given stay in the store.
    pub fn cancel_session(&self, session: &SessionState) -> SessionState {
        log::info!(
            "session cancelled after {} of {} items",
            session.position,
            session.queue.len()
        );
        SessionState {
            cancelled: true,
            ..session.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 7, 45, 0).unwrap()
    }

    fn ids(words: &[&str]) -> Vec<ItemId> {
        words.iter().map(|w| ItemId::from(*w)).collect()
    }

    fn in_order() -> SessionConfig {
        SessionConfig {
            shuffle: false,
            repeat_incorrect: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_single_new_item_session() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        let hello = ItemId::from("hello");

        let session = manager
            .start_session(&mut store, &in_order(), &[hello.clone()], t0())
            .unwrap();
        assert_eq!(session.queue, vec![hello.clone()]);
        assert_eq!(session.current_item(), Some(&hello));
        assert_eq!(session.status(), SessionStatus::Active);

        let session = manager
            .rate_current(&session, &mut store, Rating::Good, t0())
            .unwrap();
        let record = store.get(&hello).unwrap();
        assert_eq!(record.repetitions, 1);
        assert_eq!(record.interval_days, 1.0);
        assert_eq!(record.due_at, t0() + Duration::days(1));
        assert!(session.is_completed());
        assert_eq!(session.current_item(), None);
    }

    #[test]
    fn test_session_excludes_items_outside_vocabulary() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        store.put(ItemId::from("removed"), manager.scheduler().new_record(t0()));

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["kept"]), t0())
            .unwrap();
        assert_eq!(session.queue, ids(&["kept"]));
    }

    #[test]
    fn test_every_queued_item_has_a_record() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        let words = ids(&["one", "two", "three"]);

        let session = manager
            .start_session(&mut store, &in_order(), &words, t0())
            .unwrap();
        assert_eq!(session.queue.len(), 3);
        for id in &session.queue {
            assert!(store.get(id).is_some());
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_candidates_collapse() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["a", "a", "b"]), t0())
            .unwrap();
        assert_eq!(session.queue, ids(&["a", "b"]));
    }

    #[test]
    fn test_due_order_without_shuffle() {
        let manager = SessionManager::default();
        let scheduler = manager.scheduler().clone();
        let mut store = ProgressStore::in_memory();

        let mut old = scheduler.apply_rating(&scheduler.new_record(t0()), Rating::Good, t0() - Duration::days(5));
        old.due_at = t0() - Duration::days(3);
        let mut recent = old.clone();
        recent.due_at = t0() - Duration::hours(1);
        store.put(ItemId::from("recent"), recent);
        store.put(ItemId::from("old"), old);

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["recent", "old", "fresh"]), t0())
            .unwrap();
        assert_eq!(session.queue, ids(&["fresh", "old", "recent"]));
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic() {
        let manager = SessionManager::default();
        let words: Vec<ItemId> = (0..20).map(|n| ItemId::from(format!("word {n}").as_str())).collect();
        let config = SessionConfig {
            shuffle: true,
            seed: Some(42),
            ..SessionConfig::default()
        };

        let first = manager
            .start_session(&mut ProgressStore::in_memory(), &config, &words, t0())
            .unwrap();
        let second = manager
            .start_session(&mut ProgressStore::in_memory(), &config, &words, t0())
            .unwrap();
        assert_eq!(first.queue, second.queue);

        let mut sorted = first.queue.clone();
        sorted.sort();
        let mut expected = words.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_max_items_truncates() {
        let manager = SessionManager::default();
        let config = SessionConfig {
            max_items: Some(2),
            ..in_order()
        };

        let session = manager
            .start_session(&mut ProgressStore::in_memory(), &config, &ids(&["c", "a", "b"]), t0())
            .unwrap();
        assert_eq!(session.queue, ids(&["a", "b"]));
    }

    #[test]
    fn test_empty_session() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();

        let result = manager.start_session(&mut store, &in_order(), &[], t0());
        assert!(matches!(result, Err(SchedulerError::EmptySession)));

        // everything reviewed and scheduled for later
        let hello = ItemId::from("hello");
        let session = manager
            .start_session(&mut store, &in_order(), &[hello.clone()], t0())
            .unwrap();
        manager
            .rate_current(&session, &mut store, Rating::Easy, t0())
            .unwrap();
        let result = manager.start_session(&mut store, &in_order(), &[hello], t0());
        assert!(matches!(result, Err(SchedulerError::EmptySession)));
    }

    #[test]
    fn test_review_only_mode() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        let config = SessionConfig {
            include_new: false,
            ..in_order()
        };

        let result = manager.start_session(&mut store, &config, &ids(&["new"]), t0());
        assert!(matches!(result, Err(SchedulerError::EmptySession)));

        let first = manager
            .start_session(&mut store, &in_order(), &ids(&["seen"]), t0())
            .unwrap();
        manager
            .rate_current(&first, &mut store, Rating::Again, t0())
            .unwrap();

        let later = t0() + Duration::hours(1);
        let session = manager
            .start_session(&mut store, &config, &ids(&["new", "seen"]), later)
            .unwrap();
        assert_eq!(session.queue, ids(&["seen"]));
    }

    #[test]
    fn test_again_requeues_when_enabled() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        let config = SessionConfig {
            repeat_incorrect: true,
            ..in_order()
        };

        let session = manager
            .start_session(&mut store, &config, &ids(&["a", "b"]), t0())
            .unwrap();
        let session = manager
            .rate_current(&session, &mut store, Rating::Again, t0())
            .unwrap();
        assert_eq!(session.queue, ids(&["a", "b", "a"]));
        assert_eq!(session.current_item(), Some(&ItemId::from("b")));

        // Hard is struggling but does not requeue
        let session = manager
            .rate_current(&session, &mut store, Rating::Hard, t0())
            .unwrap();
        assert_eq!(session.queue.len(), 3);

        let session = manager
            .rate_current(&session, &mut store, Rating::Good, t0())
            .unwrap();
        assert!(session.is_completed());
        assert_eq!(session.correct_in_session, 1);
        assert_eq!(session.incorrect_in_session, 2);
        assert_eq!(session.current_streak, 1);
        assert_eq!(store.get(&ItemId::from("a")).unwrap().attempts(), 2);
    }

    #[test]
    fn test_each_item_at_most_once_without_repeat() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();
        let words = ids(&["a", "b", "c"]);

        let mut session = manager
            .start_session(&mut store, &in_order(), &words, t0())
            .unwrap();
        let mut seen = Vec::new();
        while let Some(id) = session.current_item().cloned() {
            seen.push(id);
            session = manager
                .rate_current(&session, &mut store, Rating::Again, t0())
                .unwrap();
            assert_eq!(session.queue.len(), words.len());
        }
        assert_eq!(seen, words);
        assert_eq!(session.current_streak, 0);
    }

    #[test]
    fn test_rate_past_end_fails() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["a"]), t0())
            .unwrap();
        let session = manager
            .rate_current(&session, &mut store, Rating::Good, t0())
            .unwrap();
        let before = store.clone();

        let result = manager.rate_current(&session, &mut store, Rating::Good, t0());
        assert!(matches!(
            result,
            Err(SchedulerError::NoCurrentItem { position: 1, len: 1 })
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn test_cancel_keeps_ratings_and_blocks_more() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["a", "b"]), t0())
            .unwrap();
        let session = manager
            .rate_current(&session, &mut store, Rating::Good, t0())
            .unwrap();
        let cancelled = manager.cancel_session(&session);

        assert_eq!(cancelled.status(), SessionStatus::Cancelled);
        assert_eq!(cancelled.current_item(), None);
        assert!(!store.get(&ItemId::from("a")).unwrap().is_new());
        assert!(store.get(&ItemId::from("b")).unwrap().is_new());
        assert!(matches!(
            manager.rate_current(&cancelled, &mut store, Rating::Good, t0()),
            Err(SchedulerError::NoCurrentItem { .. })
        ));
        // the original snapshot is untouched
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn test_rating_is_persisted_before_advancing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let manager = SessionManager::default();
        let mut store = ProgressStore::load_or_default(&path).unwrap();

        let session = manager
            .start_session(&mut store, &in_order(), &ids(&["hello", "world"]), t0())
            .unwrap();
        manager
            .rate_current(&session, &mut store, Rating::Good, t0())
            .unwrap();

        let on_disk = ProgressStore::load(&path).unwrap();
        assert_eq!(on_disk.get(&ItemId::from("hello")).unwrap().repetitions, 1);
    }

    #[test]
    fn test_session_statistics() {
        let manager = SessionManager::default();
        let mut store = ProgressStore::in_memory();

        let mut session = manager
            .start_session(&mut store, &in_order(), &ids(&["a", "b", "c", "d"]), t0())
            .unwrap();
        assert_eq!(session.accuracy(), None);
        assert_eq!(session.progress_message(), "Card 1/4");

        let later = t0() + Duration::minutes(3);
        for rating in [Rating::Good, Rating::Easy, Rating::Hard, Rating::Good] {
            session = manager
                .rate_current(&session, &mut store, rating, later)
                .unwrap();
        }
        assert_eq!(session.accuracy(), Some(0.75));
        assert_eq!(session.current_streak, 1);
        assert_eq!(session.log.len(), 4);
        assert_eq!(session.log[2].rating, Rating::Hard);
        assert_eq!(session.elapsed(later), Duration::minutes(3));
        assert_eq!(session.progress_message(), "Session complete: 4 cards");
    }

    #[test]
    fn test_rate_current_shared() {
        let manager = SessionManager::default();
        let shared = SharedProgressStore::new(ProgressStore::in_memory());

        let session = shared
            .with(|store| manager.start_session(store, &in_order(), &ids(&["a"]), t0()))
            .unwrap();
        let session = manager
            .rate_current_shared(&session, &shared, Rating::Good, t0())
            .unwrap();

        assert!(session.is_completed());
        assert_eq!(shared.snapshot().get(&ItemId::from("a")).unwrap().correct_count, 1);
    }
}
