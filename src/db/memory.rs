use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PollStore, apply_update, insert_unique, remove_by_title};
use crate::error::PollError;
use crate::models::Poll;

/// Process-local store; the write lock is the atomic boundary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    polls: RwLock<Vec<Poll>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(polls: Vec<Poll>) -> Self {
        Self {
            polls: RwLock::new(polls),
        }
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Poll>, PollError> {
        Ok(self.polls.read().await.clone())
    }

    async fn append(&self, poll: Poll) -> Result<(), PollError> {
        insert_unique(&mut *self.polls.write().await, poll)
    }

    async fn update<F>(&self, title: &str, mutator: F) -> Result<Poll, PollError>
    where
        F: FnOnce(&mut Poll) -> Result<(), PollError> + Send + 'static,
    {
        let mut polls = self.polls.write().await;
        apply_update(&mut polls, title, mutator)
    }

    async fn remove(&self, title: &str) -> Result<(), PollError> {
        remove_by_title(&mut *self.polls.write().await, title).map(|_| ())
    }
}
