//! Recall rating given after a card is revealed.
use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered by implied confidence: `Again < Hard < Good < Easy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// `Good` and `Easy` count as correct; `Again` and `Hard` as struggling.
    pub fn is_correct(self) -> bool {
        matches!(self, Rating::Good | Rating::Easy)
    }
}

impl TryFrom<u8> for Rating {
    type Error = SchedulerError;

    /// Grades 1-4, lowest confidence first.
    fn try_from(grade: u8) -> Result<Self, Self::Error> {
        match grade {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(SchedulerError::InvalidRating(other)),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        };
        f.write_str(label)
    }
}
