//! Deck is the currently loaded vocabulary: an ordered set of flashcards
use super::{Flashcard, ItemId};
use crate::error::{Result, SchedulerError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub flashcards: Vec<Flashcard>,
}

impl Default for Deck {
    fn default() -> Self {
        Self {
            name: "My Deck".to_string(),
            flashcards: Vec::new(),
        }
    }
}

impl Deck {
    /// Loads a deck written as `{ "name": ..., "flashcards": [{ "term", "definition" }] }`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| SchedulerError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|source| SchedulerError::InvalidDeck {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Candidate ids in deck order, first occurrence wins.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        self.flashcards
            .iter()
            .map(Flashcard::item_id)
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Cards keyed by id, first occurrence wins. Build once per session.
    pub fn cards_by_id(&self) -> HashMap<ItemId, &Flashcard> {
        let mut cards = HashMap::with_capacity(self.flashcards.len());
        for card in &self.flashcards {
            cards.entry(card.item_id()).or_insert(card);
        }
        cards
    }
}
