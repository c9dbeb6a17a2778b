//! Flashcard is a pair <term, definition>. The scheduler only ever sees its
//! `ItemId`; the text is display payload for the surrounding application.
use super::ItemId;
use serde::{Deserialize, Serialize};

/// Which face of the card is shown before it is flipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Word,
    Definition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

impl Flashcard {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }

    /// Identity comes from the term, the card's reference text.
    pub fn item_id(&self) -> ItemId {
        ItemId::from_reference(&self.term)
    }

    pub fn front(&self, show_first: Side) -> &str {
        match show_first {
            Side::Word => &self.term,
            Side::Definition => &self.definition,
        }
    }

    pub fn back(&self, show_first: Side) -> &str {
        match show_first {
            Side::Word => &self.definition,
            Side::Definition => &self.term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_creation() {
        let card = Flashcard::new("hello", "cześć");

        assert_eq!(card.term, "hello");
        assert_eq!(card.definition, "cześć");
    }

    #[test]
    fn test_item_id_follows_term() {
        let card = Flashcard::new("Hello!", "cześć");
        let edited = Flashcard::new("hello", "witaj");
        assert_eq!(card.item_id(), edited.item_id());
    }

    #[test]
    fn test_front_and_back() {
        let card = Flashcard::new("hello", "cześć");

        assert_eq!(card.front(Side::Word), "hello");
        assert_eq!(card.back(Side::Word), "cześć");
        assert_eq!(card.front(Side::Definition), "cześć");
        assert_eq!(card.back(Side::Definition), "hello");
    }
}
