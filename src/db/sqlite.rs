use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sqlx::{
    Executor, Sqlite, SqliteConnection,
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use tokio::sync::Mutex;

use super::{PollStore, apply_update, insert_unique, remove_by_title};
use crate::config::Config;
use crate::error::PollError;
use crate::models::Poll;

/// SQLite backed store. The poll collection lives in a single row as a JSON
/// list; every write rewrites that row inside a transaction.
pub struct Database {
    pool: SqlitePool,
    collection: String,
    // Serialises read-modify-write cycles of this process.
    write_lock: Mutex<()>,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, PollError> {
        Self::connect(&config.database_url, &config.collection).await
    }

    pub async fn connect(db_url: &str, collection: &str) -> Result<Self, PollError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;
        info!("Opened poll store at {} (collection {})", db_url, collection);

        Ok(Self {
            pool,
            collection: collection.to_string(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), PollError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn modify<T, F>(&self, op: F) -> Result<T, PollError>
    where
        F: FnOnce(&mut Vec<Poll>) -> Result<T, PollError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut polls = fetch_collection(&mut *tx, &self.collection).await?;
        // Returning early drops `tx`, which rolls it back.
        let out = op(&mut polls)?;
        store_collection(&mut tx, &self.collection, &polls).await?;

        tx.commit().await?;
        debug!("Committed {} poll(s) to {}", polls.len(), self.collection);
        Ok(out)
    }
}

async fn fetch_collection<'e, E>(executor: E, name: &str) -> Result<Vec<Poll>, PollError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let body: Option<String> = sqlx::query_scalar("SELECT body FROM collections WHERE name = ?")
        .bind(name)
        .fetch_optional(executor)
        .await?;

    match body {
        Some(body) => Ok(serde_json::from_str(&body)?),
        None => Ok(Vec::new()),
    }
}

async fn store_collection(
    conn: &mut SqliteConnection,
    name: &str,
    polls: &[Poll],
) -> Result<(), PollError> {
    let body = serde_json::to_string(polls)?;
    sqlx::query(
        r#"
        INSERT INTO collections (name, body, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(name)
        DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#,
    )
    .bind(name)
    .bind(body)
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl PollStore for Database {
    async fn list(&self) -> Result<Vec<Poll>, PollError> {
        fetch_collection(&self.pool, &self.collection).await
    }

    async fn append(&self, poll: Poll) -> Result<(), PollError> {
        self.modify(move |polls| insert_unique(polls, poll)).await
    }

    async fn update<F>(&self, title: &str, mutator: F) -> Result<Poll, PollError>
    where
        F: FnOnce(&mut Poll) -> Result<(), PollError> + Send + 'static,
    {
        self.modify(move |polls| apply_update(polls, title, mutator)).await
    }

    async fn remove(&self, title: &str) -> Result<(), PollError> {
        self.modify(|polls| remove_by_title(polls, title).map(|_| ())).await
    }
}
