//! SQLite message history: append-only snapshots, latest-version dedup, pagination,
//! and business-connection ownership.
//!
//! Every snapshot gets its id from one shared counter row (`counters`), the only write hot spot.
//! External: SQLite via sqlx; callers go through the [`MessageStore`] / [`ConnectionStore`] traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use wbot_core::{BusinessConnection, BusinessMessage, MessageSnapshot};

use crate::error::StorageError;
use crate::models::{MessagesQuery, Page, SnapshotRecord};
use crate::repository::{ConnectionStore, MessageStore};
use crate::sqlite_pool::SqlitePoolManager;

const SEQUENCE_NAME: &str = "message_snapshots";
const COUNTER_DEADLINE: Duration = Duration::from_secs(5);
const WRITE_DEADLINE: Duration = Duration::from_secs(5);
const READ_DEADLINE: Duration = Duration::from_secs(10);

const SNAPSHOT_COLUMNS: &str =
    "sequence_id, chat_id, connection_id, message_id, date, edit_date, media_group_id, payload";

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteMessageStore {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let store = Self { pool_manager };
        store.init().await?;
        Ok(store)
    }

    /// Closes the pool at shutdown. Pending writes finish first.
    pub async fn close(&self) {
        info!("Closing message store");
        self.pool_manager.close().await;
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        info!("Creating history tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_snapshots (
                sequence_id INTEGER PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                connection_id TEXT NOT NULL,
                message_id INTEGER NOT NULL,
                date INTEGER NOT NULL,
                edit_date INTEGER NOT NULL DEFAULT 0,
                media_group_id TEXT,
                payload TEXT NOT NULL,
                archived_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_snapshots_lookup
            ON message_snapshots (chat_id, connection_id, message_id, edit_date DESC, date DESC)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS business_connections (
                id TEXT PRIMARY KEY,
                owner_user_id INTEGER NOT NULL,
                enabled INTEGER NOT NULL,
                date INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_connections_owner ON business_connections (owner_user_id)",
        )
        .execute(pool)
        .await?;

        info!("History tables created successfully");
        Ok(())
    }

    async fn fetch_next_sequence(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO counters (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(SEQUENCE_NAME)
        .fetch_one(self.pool_manager.pool())
        .await
    }

    /// Next global sequence id. A connectivity failure is retried once; both attempts share
    /// one 5 second deadline, after which the failure is reported as transient.
    pub async fn next_sequence(&self) -> Result<i64, StorageError> {
        let attempts = async {
            match self.fetch_next_sequence().await {
                Err(e) if StorageError::is_transient(&e) => {
                    warn!(error = %e, "step: sequence fetch failed, retrying once");
                    self.fetch_next_sequence().await
                }
                other => other,
            }
        };

        match timeout(COUNTER_DEADLINE, attempts).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if StorageError::is_transient(&e) => {
                Err(StorageError::Transient(e.to_string()))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StorageError::Transient(format!(
                "sequence fetch exceeded {:?}",
                COUNTER_DEADLINE
            ))),
        }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &MessagesQuery) {
        builder.push(" WHERE chat_id = ").push_bind(query.chat_id);

        builder.push(" AND connection_id IN (");
        let mut ids = builder.separated(", ");
        for connection_id in &query.connection_ids {
            ids.push_bind(connection_id.clone());
        }
        ids.push_unseparated(")");

        builder.push(" AND message_id IN (");
        let mut ids = builder.separated(", ");
        for message_id in &query.message_ids {
            ids.push_bind(i64::from(*message_id));
        }
        ids.push_unseparated(")");
    }

    fn decode(records: Vec<SnapshotRecord>) -> Vec<MessageSnapshot> {
        records
            .into_iter()
            .filter_map(|record| {
                let sequence_id = record.sequence_id;
                match record.into_snapshot() {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(sequence_id, error = %e, "failed to decode snapshot payload");
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    #[instrument(
        skip(self, message),
        fields(chat_id = message.chat.id, message_id = message.message_id)
    )]
    async fn save_snapshot(
        &self,
        message: &BusinessMessage,
    ) -> Result<MessageSnapshot, StorageError> {
        let sequence_id = self.next_sequence().await?;
        let record = SnapshotRecord::new(sequence_id, message)?;

        let insert = sqlx::query(
            r#"
            INSERT INTO message_snapshots (sequence_id, chat_id, connection_id, message_id, date, edit_date, media_group_id, payload, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.sequence_id)
        .bind(record.chat_id)
        .bind(&record.connection_id)
        .bind(record.message_id)
        .bind(record.date)
        .bind(record.edit_date)
        .bind(&record.media_group_id)
        .bind(&record.payload)
        .bind(Utc::now())
        .execute(self.pool_manager.pool());

        timeout(WRITE_DEADLINE, insert)
            .await
            .map_err(|_| StorageError::Timeout("save_snapshot"))??;

        debug!(
            sequence_id,
            edit_date = message.edit_date,
            "Saved snapshot"
        );

        Ok(MessageSnapshot {
            sequence_id,
            message: message.clone(),
        })
    }

    #[instrument(
        skip(self, query),
        fields(chat_id = query.chat_id, offset = query.offset, limit = query.limit)
    )]
    async fn list_latest(
        &self,
        query: &MessagesQuery,
    ) -> Result<Page<MessageSnapshot>, StorageError> {
        if query.matches_nothing() {
            return Ok(Page::from_overfetched(Vec::new(), query.offset, query.limit));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY message_id ORDER BY edit_date DESC, date DESC, sequence_id DESC) AS revision_rank FROM message_snapshots",
            SNAPSHOT_COLUMNS
        ));
        Self::push_filter(&mut builder, query);
        builder.push(") WHERE revision_rank = 1 ORDER BY message_id ASC");

        if query.limit > 0 {
            builder.push(" LIMIT ").push_bind(i64::from(query.limit) + 1);
        } else {
            builder.push(" LIMIT -1");
        }
        builder.push(" OFFSET ").push_bind(i64::from(query.offset));

        let records = timeout(
            READ_DEADLINE,
            builder
                .build_query_as::<SnapshotRecord>()
                .fetch_all(self.pool_manager.pool()),
        )
        .await
        .map_err(|_| StorageError::Timeout("list_latest"))??;

        let fetched = records.len();
        let page = Page::from_overfetched(records, query.offset, query.limit);
        debug!(fetched, forward = page.cursor.forward, "Retrieved latest revisions");

        Ok(Page {
            items: Self::decode(page.items),
            cursor: page.cursor,
        })
    }

    #[instrument(skip(self, query), fields(chat_id = query.chat_id))]
    async fn get_with_edits(
        &self,
        query: &MessagesQuery,
    ) -> Result<Vec<MessageSnapshot>, StorageError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM message_snapshots",
            SNAPSHOT_COLUMNS
        ));
        Self::push_filter(&mut builder, query);
        builder.push(" ORDER BY message_id ASC, date DESC, edit_date DESC, sequence_id DESC");

        let records = timeout(
            READ_DEADLINE,
            builder
                .build_query_as::<SnapshotRecord>()
                .fetch_all(self.pool_manager.pool()),
        )
        .await
        .map_err(|_| StorageError::Timeout("get_with_edits"))??;

        debug!(revisions = records.len(), "Retrieved revisions with edits");
        Ok(Self::decode(records))
    }
}

#[async_trait]
impl ConnectionStore for SqliteMessageStore {
    async fn upsert_connection(&self, connection: &BusinessConnection) -> Result<(), StorageError> {
        let upsert = sqlx::query(
            r#"
            INSERT INTO business_connections (id, owner_user_id, enabled, date, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_user_id = excluded.owner_user_id,
                enabled = excluded.enabled,
                date = excluded.date,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&connection.id)
        .bind(connection.owner_user_id)
        .bind(connection.enabled)
        .bind(connection.date)
        .bind(Utc::now())
        .execute(self.pool_manager.pool());

        timeout(WRITE_DEADLINE, upsert)
            .await
            .map_err(|_| StorageError::Timeout("upsert_connection"))??;

        info!(
            connection_id = %connection.id,
            owner_user_id = connection.owner_user_id,
            enabled = connection.enabled,
            "Saved business connection"
        );
        Ok(())
    }

    async fn connection(&self, id: &str) -> Result<Option<BusinessConnection>, StorageError> {
        let row: Option<(String, i64, bool, i64)> = timeout(
            READ_DEADLINE,
            sqlx::query_as(
                "SELECT id, owner_user_id, enabled, date FROM business_connections WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(self.pool_manager.pool()),
        )
        .await
        .map_err(|_| StorageError::Timeout("connection"))??;

        Ok(row.map(|(id, owner_user_id, enabled, date)| BusinessConnection {
            id,
            owner_user_id,
            enabled,
            date,
        }))
    }

    async fn connection_ids_for_owner(
        &self,
        owner_user_id: i64,
    ) -> Result<Vec<String>, StorageError> {
        let ids = timeout(
            READ_DEADLINE,
            sqlx::query_scalar::<_, String>(
                "SELECT id FROM business_connections WHERE owner_user_id = ? ORDER BY date ASC",
            )
            .bind(owner_user_id)
            .fetch_all(self.pool_manager.pool()),
        )
        .await
        .map_err(|_| StorageError::Timeout("connection_ids_for_owner"))??;

        Ok(ids)
    }
}
