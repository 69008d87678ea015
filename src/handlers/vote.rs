use log::{info, warn};
use std::sync::Arc;

use crate::clock::Clock;
use crate::db::PollStore;
use crate::error::PollError;
use crate::lifecycle::{self, PollStatus};
use crate::models::Poll;

/// Records single votes against stored polls.
pub struct VoteRecorder<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for VoteRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: PollStore> VoteRecorder<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Adds one vote to `option_index` of the poll titled `title` and returns
    /// the poll as stored afterwards.
    pub async fn cast_vote(&self, title: &str, option_index: usize) -> Result<Poll, PollError> {
        let current = self.store.get(title).await?;
        check_votable(&current, option_index, self.clock.as_ref())?;

        // The poll may close between the check above and the write, so the
        // same check runs again inside the store's atomic update.
        let clock = Arc::clone(&self.clock);
        let result = self
            .store
            .update(title, move |poll| {
                check_votable(poll, option_index, clock.as_ref())?;
                poll.options[option_index].vote_count += 1;
                Ok(())
            })
            .await;

        match &result {
            Ok(poll) => info!(
                "Recorded vote for option {} ({}) in poll {:?}",
                option_index, poll.options[option_index].text, poll.title
            ),
            Err(e) => warn!("Rejected vote on poll {:?}: {}", title, e),
        }
        result
    }
}

fn check_votable(poll: &Poll, option_index: usize, clock: &dyn Clock) -> Result<(), PollError> {
    if lifecycle::status(poll, clock.now()) == PollStatus::Closed {
        return Err(PollError::PollClosed(poll.title.clone()));
    }
    if option_index >= poll.options.len() {
        return Err(PollError::InvalidOption {
            index: option_index,
            len: poll.options.len(),
        });
    }
    Ok(())
}
