pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, MasteryConfig, SchedulerConfig, SessionConfig};
pub use error::{Result, SchedulerError};
pub use models::{
    Deck, Flashcard, ItemId, ProgressRecord, Rating, Scheduler, SessionManager, SessionState,
};
pub use storage::{ProgressStore, SharedProgressStore};
