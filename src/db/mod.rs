mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::Database;

use async_trait::async_trait;

use crate::error::PollError;
use crate::models::Poll;

/// Owner of the canonical poll records. Every change goes through
/// `append`, `update` or `remove`, each of which is all-or-nothing.
#[async_trait]
pub trait PollStore: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<Poll>, PollError>;

    async fn get(&self, title: &str) -> Result<Poll, PollError> {
        self.list()
            .await?
            .into_iter()
            .find(|poll| poll.title == title)
            .ok_or_else(|| PollError::NotFound(title.to_string()))
    }

    async fn append(&self, poll: Poll) -> Result<(), PollError>;

    /// Reads the current record for `title`, applies `mutator` and persists
    /// the whole collection as one step. If the mutator fails, or the write
    /// does, nothing is stored.
    async fn update<F>(&self, title: &str, mutator: F) -> Result<Poll, PollError>
    where
        F: FnOnce(&mut Poll) -> Result<(), PollError> + Send + 'static;

    async fn remove(&self, title: &str) -> Result<(), PollError>;
}

pub(crate) fn insert_unique(polls: &mut Vec<Poll>, poll: Poll) -> Result<(), PollError> {
    poll.validate()?;
    if polls.iter().any(|existing| existing.title == poll.title) {
        return Err(PollError::DuplicateTitle(poll.title));
    }
    polls.push(poll);
    Ok(())
}

// Mutates a copy and only swaps it in once the mutator and the
// lifetime invariants both pass.
pub(crate) fn apply_update<F>(polls: &mut [Poll], title: &str, mutator: F) -> Result<Poll, PollError>
where
    F: FnOnce(&mut Poll) -> Result<(), PollError>,
{
    let slot = polls
        .iter_mut()
        .find(|poll| poll.title == title)
        .ok_or_else(|| PollError::NotFound(title.to_string()))?;

    let mut next = slot.clone();
    mutator(&mut next)?;
    slot.check_transition(&next)?;

    *slot = next.clone();
    Ok(next)
}

pub(crate) fn remove_by_title(polls: &mut Vec<Poll>, title: &str) -> Result<Poll, PollError> {
    let index = polls
        .iter()
        .position(|poll| poll.title == title)
        .ok_or_else(|| PollError::NotFound(title.to_string()))?;
    Ok(polls.remove(index))
}
