/// Runs the vote and store contracts against a real on-disk SQLite database.
/// Each test gets its own temporary directory.
use chrono::{DateTime, TimeZone, Utc};
use poll_tally::commands::poll;
use poll_tally::voting;
use poll_tally::{
    Database, DurationUnit, ManualClock, Poll, PollDraft, PollError, PollOption, PollStore,
    VoteRecorder,
};
use std::sync::Arc;
use tempfile::TempDir;

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

fn lunch() -> Poll {
    Poll {
        id: "lunch-id".to_string(),
        title: "Lunch".to_string(),
        options: vec![
            PollOption { text: "Pizza".to_string(), vote_count: 0 },
            PollOption { text: "Sushi".to_string(), vote_count: 0 },
        ],
        start_time: at(0),
        end_time: at(1000),
    }
}

async fn open_store(dir: &TempDir) -> Database {
    let url = format!("sqlite://{}", dir.path().join("polls.db").display());
    Database::connect(&url, "ONGOING_POLLS").await.unwrap()
}

#[tokio::test]
async fn test_lunch_scenario_persists() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir).await);
    store.append(lunch()).await.unwrap();
    let clock = Arc::new(ManualClock::new(at(0)));
    let recorder = VoteRecorder::new(Arc::clone(&store), clock.clone());

    // WHEN
    recorder.cast_vote("Lunch", 0).await.unwrap();
    let poll = recorder.cast_vote("Lunch", 1).await.unwrap();

    // THEN
    let tally = voting::tally(&poll);
    assert_eq!(tally.counts, vec![1, 1]);
    assert_eq!(tally.leader(&poll).unwrap().text, "Pizza");

    clock.set(at(1000));
    let before = store.list().await.unwrap();
    assert!(matches!(
        recorder.cast_vote("Lunch", 0).await,
        Err(PollError::PollClosed(_))
    ));
    assert_eq!(store.list().await.unwrap(), before);
}

#[tokio::test]
async fn test_records_survive_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir).await;
        store.append(lunch()).await.unwrap();
        store
            .update("Lunch", |p| {
                p.options[1].vote_count += 3;
                Ok(())
            })
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = open_store(&dir).await;
    let poll = store.get("Lunch").await.unwrap();
    assert_eq!(poll.id, "lunch-id");
    assert_eq!(voting::tally(&poll).counts, vec![0, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_are_never_lost() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir).await);
    store.append(lunch()).await.unwrap();
    let mut other = lunch();
    other.title = "Dinner".to_string();
    other.id = "dinner-id".to_string();
    store.append(other).await.unwrap();

    let recorder = VoteRecorder::new(Arc::clone(&store), Arc::new(ManualClock::new(at(1))));

    let mut handles = Vec::new();
    for i in 0..30 {
        let recorder = recorder.clone();
        let title = if i % 3 == 0 { "Dinner" } else { "Lunch" };
        handles.push(tokio::spawn(async move { recorder.cast_vote(title, i % 2).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let lunch_total = voting::tally(&store.get("Lunch").await.unwrap()).total;
    let dinner_total = voting::tally(&store.get("Dinner").await.unwrap()).total;
    assert_eq!(lunch_total, 20);
    assert_eq!(dinner_total, 10);
}

#[tokio::test]
async fn test_failed_update_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.append(lunch()).await.unwrap();
    let before = store.list().await.unwrap();

    let err = store
        .update("Lunch", |p| {
            p.end_time = p.end_time + chrono::Duration::hours(1);
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::InvalidPoll(_)));

    let err = store.update("Breakfast", |_| Ok(())).await.unwrap_err();
    assert_eq!(err, PollError::NotFound("Breakfast".to_string()));

    assert_eq!(store.list().await.unwrap(), before);
}

#[tokio::test]
async fn test_authoring_through_the_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let clock = ManualClock::new(at(0));

    let draft = PollDraft {
        title: "Retro day".to_string(),
        options: vec!["Monday".to_string(), "Friday".to_string(), "".to_string()],
        duration: 1,
        unit: DurationUnit::Days,
    };
    let created = poll::create_poll(&store, &clock, draft.clone()).await.unwrap();
    assert_eq!(created.options.len(), 2);
    assert!(matches!(
        poll::create_poll(&store, &clock, draft).await,
        Err(PollError::DuplicateTitle(_))
    ));

    poll::delete_poll(&store, "Retro day").await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupted_collection_surfaces_as_persistence_error() {
    // GIVEN a collection row whose body is not JSON
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.append(lunch()).await.unwrap();
    sqlx::query("UPDATE collections SET body = 'not json' WHERE name = ?")
        .bind("ONGOING_POLLS")
        .execute(store.pool())
        .await
        .unwrap();

    // WHEN
    let updated = store
        .update("Lunch", |p| {
            p.options[0].vote_count += 1;
            Ok(())
        })
        .await;
    let mut other = lunch();
    other.title = "Dinner".to_string();
    other.id = "dinner-id".to_string();
    let appended = store.append(other).await;
    let listed = store.list().await;

    // THEN
    assert!(matches!(updated, Err(PollError::Persistence(_))));
    assert!(matches!(appended, Err(PollError::Persistence(_))));
    assert!(matches!(listed, Err(PollError::Persistence(_))));

    let body: String = sqlx::query_scalar("SELECT body FROM collections WHERE name = ?")
        .bind("ONGOING_POLLS")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(body, "not json");
}
