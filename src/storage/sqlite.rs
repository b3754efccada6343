//! SQLite record table

use super::{RecordTable, SortQuery};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    pk TEXT NOT NULL,
    sk TEXT NOT NULL,
    payload TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    PRIMARY KEY (pk, sk)
)
"#;

pub struct SqliteTable {
    pool: SqlitePool,
}

impl SqliteTable {
    /// Open (creating if missing) the database file at `path`
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    /// Private in-memory database; a single connection so every query sees the same data
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        tracing::debug!("SQLite record table ready");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordTable for SqliteTable {
    async fn put(&self, pk: &str, sk: &str, payload: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO records (pk, sk, payload) VALUES (?, ?, ?) \
             ON CONFLICT(pk, sk) DO UPDATE SET payload = excluded.payload, \
             written_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(pk)
        .bind(sk)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<String>> {
        let payload = sqlx::query_scalar::<_, String>("SELECT payload FROM records WHERE pk = ? AND sk = ?")
            .bind(pk)
            .bind(sk)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payload)
    }

    async fn query(&self, pk: &str, query: &SortQuery) -> Result<Vec<String>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT payload FROM records WHERE pk = ");
        builder.push_bind(pk.to_string());
        if let Some(from) = &query.from {
            builder.push(" AND sk >= ").push_bind(from.clone());
        }
        if let Some(to) = &query.to {
            builder.push(" AND sk <= ").push_bind(to.clone());
        }
        builder.push(if query.descending {
            " ORDER BY sk DESC"
        } else {
            " ORDER BY sk ASC"
        });
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn replace_partition(&self, pk: &str, rows: &[(String, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM records WHERE pk = ?")
            .bind(pk)
            .execute(&mut *tx)
            .await?;
        for (sk, payload) in rows {
            sqlx::query("INSERT INTO records (pk, sk, payload) VALUES (?, ?, ?)")
                .bind(pk)
                .bind(sk)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
