pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod tasks;
pub mod voting;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ObserverSettings};
pub use db::{Database, MemoryStore, PollStore};
pub use error::PollError;
pub use handlers::VoteRecorder;
pub use lifecycle::{PollStatus, RemainingTime};
pub use models::{DurationUnit, Poll, PollDraft, PollOption};
pub use tasks::{ObserverEvent, ObserverHandle, ObserverState, ResultObserver, TallySnapshot};
pub use voting::Tally;
