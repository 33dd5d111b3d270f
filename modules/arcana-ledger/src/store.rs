// SQLite persistence for the topic ledger. Single-writer by design: the
// connection takes no busy timeout, so a concurrently held write lock
// surfaces as an error instead of silently serializing behind it.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use arcana_common::taxonomy::Taxonomy;
use arcana_common::types::{PostStatus, Topic};

use crate::error::Result;

pub struct TopicLedger {
    pool: SqlitePool,
}

/// A row from the articles table. Entries are never mutated after
/// creation; corrections are new entries.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub personality: String,
    pub situation: String,
    pub card: String,
    pub title: String,
    pub remote_id: Option<i64>,
    pub remote_url: Option<String>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl sqlx::FromRow<'_, SqliteRow> for LedgerEntry {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let id: String = row.try_get("id")?;
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: Uuid::parse_str(&id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "id".to_string(),
                source: Box::new(e),
            })?,
            personality: row.try_get("personality")?,
            situation: row.try_get("situation")?,
            card: row.try_get("card")?,
            title: row.try_get("title")?,
            remote_id: row.try_get("remote_id")?,
            remote_url: row.try_get("remote_url")?,
            status: PostStatus::parse(&status).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("unknown status: {status}").into(),
            })?,
            created_at: row.try_get("created_at")?,
            error: row.try_get("error")?,
        })
    }
}

/// Parameters for appending a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub topic: Topic,
    pub title: String,
    pub remote_id: Option<i64>,
    pub remote_url: Option<String>,
    pub status: PostStatus,
    pub error: Option<String>,
}

/// Aggregate counts over the ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub total: u64,
    pub by_status: HashMap<PostStatus, u64>,
    pub success_rate: f64,
}

impl std::fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Publication Ledger ===")?;
        writeln!(f, "Entries recorded:   {}", self.total)?;
        for status in [
            PostStatus::Published,
            PostStatus::Scheduled,
            PostStatus::Draft,
            PostStatus::Failed,
        ] {
            let count = self.by_status.get(&status).copied().unwrap_or(0);
            writeln!(f, "  {:<10} {}", format!("{status}:"), count)?;
        }
        writeln!(f, "Success rate:       {:.1}%", self.success_rate)?;
        Ok(())
    }
}

impl TopicLedger {
    /// Open (creating if missing) the ledger at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // Fail fast on a concurrently held write lock. The store is
            // declared single-writer; contention means a second pipeline
            // run is active and must be surfaced, not waited out.
            .busy_timeout(Duration::ZERO);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// In-memory ledger for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .busy_timeout(Duration::ZERO);

        // A single connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                personality TEXT NOT NULL,
                situation TEXT NOT NULL,
                card TEXT NOT NULL,
                title TEXT NOT NULL,
                remote_id INTEGER,
                remote_url TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_topic
            ON articles(personality, situation, card)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// True iff a published or scheduled entry exists for this exact topic.
    /// Draft and failed entries do not block re-selection: a draft may be
    /// promoted later and a failure may be transient.
    pub async fn exists(&self, topic: &Topic) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM articles
            WHERE personality = ?1 AND situation = ?2 AND card = ?3
              AND status IN ('published', 'scheduled')
            "#,
        )
        .bind(&topic.personality)
        .bind(&topic.situation)
        .bind(&topic.card.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Append an entry. Never overwrites; the insert commits before this
    /// returns, so entries survive a crash between runs.
    pub async fn record(&self, entry: NewEntry) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO articles
                (id, personality, situation, card, title,
                 remote_id, remote_url, status, created_at, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(id.to_string())
        .bind(&entry.topic.personality)
        .bind(&entry.topic.situation)
        .bind(&entry.topic.card.name)
        .bind(&entry.title)
        .bind(entry.remote_id)
        .bind(&entry.remote_url)
        .bind(entry.status.as_str())
        .bind(created_at)
        .bind(&entry.error)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            topic = %entry.topic,
            status = %entry.status,
            "Ledger entry recorded"
        );

        Ok(id)
    }

    /// Count of live published entries.
    pub async fn count_published(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE status = 'published'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    /// Combinations not yet consumed by a published or scheduled entry.
    pub async fn remaining_combinations(&self, taxonomy: &Taxonomy) -> Result<u64> {
        let consumed: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT personality || '|' || situation || '|' || card)
            FROM articles
            WHERE status IN ('published', 'scheduled')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(taxonomy.total_combinations().saturating_sub(consumed as u64))
    }

    /// Aggregate counts by status. Drafts count toward the success rate
    /// since they can be promoted by hand.
    pub async fn statistics(&self) -> Result<LedgerStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM articles GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut by_status = HashMap::new();
        let mut total: u64 = 0;
        for (status, count) in rows {
            total += count as u64;
            if let Some(parsed) = PostStatus::parse(&status) {
                by_status.insert(parsed, count as u64);
            }
        }

        let failed = by_status.get(&PostStatus::Failed).copied().unwrap_or(0);
        let success_rate = if total > 0 {
            (total - failed) as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(LedgerStats {
            total,
            by_status,
            success_rate,
        })
    }

    /// Every entry recorded for a topic, oldest first.
    pub async fn entries_for_topic(&self, topic: &Topic) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM articles
            WHERE personality = ?1 AND situation = ?2 AND card = ?3
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(&topic.personality)
        .bind(&topic.situation)
        .bind(&topic.card.name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcana_common::types::{Card, DeckKind};

    fn sample_topic() -> Topic {
        Topic {
            personality: "INFP".to_string(),
            situation: "연애 불안 (relationship anxiety)".to_string(),
            card: Card::new("The Moon", "달", DeckKind::Tarot),
        }
    }

    fn entry(status: PostStatus) -> NewEntry {
        NewEntry {
            topic: sample_topic(),
            title: "시험 제목".to_string(),
            remote_id: status.blocks_reselection().then_some(42),
            remote_url: None,
            status,
            error: (status == PostStatus::Failed).then(|| "boom".to_string()),
        }
    }

    #[tokio::test]
    async fn published_entry_blocks_topic() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        assert!(!ledger.exists(&sample_topic()).await.expect("exists"));

        ledger.record(entry(PostStatus::Published)).await.expect("record");
        assert!(ledger.exists(&sample_topic()).await.expect("exists"));
    }

    #[tokio::test]
    async fn scheduled_entry_blocks_topic() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        ledger.record(entry(PostStatus::Scheduled)).await.expect("record");
        assert!(ledger.exists(&sample_topic()).await.expect("exists"));
    }

    #[tokio::test]
    async fn draft_and_failed_entries_do_not_block() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        ledger.record(entry(PostStatus::Draft)).await.expect("record");
        ledger.record(entry(PostStatus::Failed)).await.expect("record");
        assert!(!ledger.exists(&sample_topic()).await.expect("exists"));
    }

    #[tokio::test]
    async fn entries_append_never_overwrite() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        ledger.record(entry(PostStatus::Failed)).await.expect("record");
        ledger.record(entry(PostStatus::Published)).await.expect("record");

        let entries = ledger
            .entries_for_topic(&sample_topic())
            .await
            .expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, PostStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("boom"));
        assert_eq!(entries[1].status, PostStatus::Published);
        assert_eq!(entries[1].remote_id, Some(42));
    }

    #[tokio::test]
    async fn statistics_aggregate_by_status() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        ledger.record(entry(PostStatus::Published)).await.expect("record");
        ledger.record(entry(PostStatus::Draft)).await.expect("record");
        ledger.record(entry(PostStatus::Failed)).await.expect("record");

        let stats = ledger.statistics().await.expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.get(&PostStatus::Published), Some(&1));
        assert_eq!(stats.by_status.get(&PostStatus::Failed), Some(&1));
        assert!((stats.success_rate - 66.666).abs() < 0.1);

        assert_eq!(ledger.count_published().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn remaining_combinations_counts_delivered_only() {
        let ledger = TopicLedger::open_in_memory().await.expect("open");
        let taxonomy = Taxonomy::default();
        let total = taxonomy.total_combinations();

        ledger.record(entry(PostStatus::Draft)).await.expect("record");
        assert_eq!(
            ledger.remaining_combinations(&taxonomy).await.expect("remaining"),
            total
        );

        ledger.record(entry(PostStatus::Published)).await.expect("record");
        assert_eq!(
            ledger.remaining_combinations(&taxonomy).await.expect("remaining"),
            total - 1
        );

        // A second delivered entry for the same triple does not double-count.
        ledger.record(entry(PostStatus::Scheduled)).await.expect("record");
        assert_eq!(
            ledger.remaining_combinations(&taxonomy).await.expect("remaining"),
            total - 1
        );
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.db");

        {
            let ledger = TopicLedger::open(&path).await.expect("open");
            ledger.record(entry(PostStatus::Published)).await.expect("record");
        }

        let reopened = TopicLedger::open(&path).await.expect("reopen");
        assert!(reopened.exists(&sample_topic()).await.expect("exists"));
    }

    #[tokio::test]
    async fn concurrent_writer_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.db");

        let first = TopicLedger::open(&path).await.expect("open first");
        let second = TopicLedger::open(&path).await.expect("open second");

        // Hold an uncommitted write on the first connection.
        let mut tx = first.pool.begin().await.expect("begin");
        sqlx::query(
            "INSERT INTO articles (id, personality, situation, card, title, status, created_at)
             VALUES ('held', 'a', 'b', 'c', 't', 'draft', '2026-01-01T00:00:00Z')",
        )
        .execute(&mut *tx)
        .await
        .expect("held insert");

        // The second writer must error immediately, not wait or corrupt.
        let result = second.record(entry(PostStatus::Draft)).await;
        assert!(result.is_err(), "concurrent write should fail loudly");

        tx.rollback().await.expect("rollback");
        second
            .record(entry(PostStatus::Draft))
            .await
            .expect("write succeeds once the lock is released");
    }
}
