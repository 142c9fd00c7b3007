use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, Feed, FeedListing, FeedListingRow, FeedRow};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Add a feed owned by `user_id`. Fails with `Duplicate("feed")` if the URL is known.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<Feed, DatabaseError> {
        let now = to_millis(Utc::now());
        let row: FeedRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(url)
        .bind(user_id.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::on_unique("feed"))?;

        tracing::debug!(feed = %row.url, name = %row.name, "Created feed");
        Ok(row.into())
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, DatabaseError> {
        let row: Option<FeedRow> =
            sqlx::query_as(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"))
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Feed::from).ok_or(DatabaseError::NotFound("feed"))
    }

    /// Every feed with the name of the user who added it, in creation order.
    pub async fn get_feeds(&self) -> Result<Vec<FeedListing>, DatabaseError> {
        let rows: Vec<FeedListingRow> = sqlx::query_as(
            r#"
            SELECT f.name, f.url, u.name AS creator
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.seq
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedListing::from).collect())
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// The globally least-recently-fetched feed.
    ///
    /// Never-fetched feeds (NULL `last_fetched_at`) come before any fetched
    /// feed; ties are broken by insertion order so repeated calls walk
    /// through identical timestamps instead of sticking on one feed.
    ///
    /// Fails with `NotFound("feed")` when no feeds exist.
    pub async fn next_feed_to_fetch(&self) -> Result<Feed, DatabaseError> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, seq ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Feed::from).ok_or(DatabaseError::NotFound("feed"))
    }

    /// Record that the scheduler picked `feed_id` at `fetched_at`.
    ///
    /// Unconditional: called before the network fetch, whether or not it
    /// later succeeds.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let ts = to_millis(fetched_at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
                .bind(ts)
                .bind(ts)
                .bind(feed_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(feed_id = %feed_id, "mark_feed_fetched matched no rows");
        }
        Ok(())
    }
}
