mod vote;

pub use vote::VoteRecorder;
