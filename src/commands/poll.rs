use chrono::Duration;
use log::info;

use crate::clock::Clock;
use crate::db::PollStore;
use crate::error::PollError;
use crate::lifecycle::{self, PollStatus};
use crate::models::{Poll, PollDraft};

/// A stored poll together with its status at listing time.
#[derive(Debug, Clone)]
pub struct PollListing {
    pub poll: Poll,
    pub status: PollStatus,
    pub remaining: Duration,
}

pub async fn create_poll<S: PollStore>(
    store: &S,
    clock: &dyn Clock,
    draft: PollDraft,
) -> Result<Poll, PollError> {
    let poll = Poll::from_draft(draft, clock.now())?;
    store.append(poll.clone()).await?;
    info!(
        "Created poll {:?} ({}) with {} options, closing at {}",
        poll.title,
        poll.id,
        poll.options.len(),
        poll.end_time.to_rfc3339()
    );
    Ok(poll)
}

pub async fn delete_poll<S: PollStore>(store: &S, title: &str) -> Result<(), PollError> {
    store.remove(title).await?;
    info!("Deleted poll {:?}", title);
    Ok(())
}

pub async fn list_polls<S: PollStore>(store: &S, clock: &dyn Clock) -> Result<Vec<PollListing>, PollError> {
    let now = clock.now();
    Ok(store
        .list()
        .await?
        .into_iter()
        .map(|poll| PollListing {
            status: lifecycle::status(&poll, now),
            remaining: lifecycle::remaining(&poll, now),
            poll,
        })
        .collect())
}

// Case-insensitive title match; a blank query lists everything.
pub async fn search_polls<S: PollStore>(
    store: &S,
    clock: &dyn Clock,
    query: &str,
) -> Result<Vec<PollListing>, PollError> {
    let needle = query.trim().to_lowercase();
    let listings = list_polls(store, clock).await?;
    if needle.is_empty() {
        return Ok(listings);
    }
    Ok(listings
        .into_iter()
        .filter(|listing| listing.poll.title.to_lowercase().contains(&needle))
        .collect())
}
