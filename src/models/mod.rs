pub mod deck;
pub mod flashcard;
pub mod item_id;
pub mod learning_session;
pub mod progress_record;
pub mod rating;
pub mod sm2;
pub mod statistics;

pub use deck::Deck;
pub use flashcard::{Flashcard, Side};
pub use item_id::ItemId;
pub use learning_session::{ReviewEvent, SessionManager, SessionState, SessionStatus};
pub use progress_record::ProgressRecord;
pub use rating::Rating;
pub use sm2::{DueMode, Scheduler, is_due};
pub use statistics::ProgressSummary;
