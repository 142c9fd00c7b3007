use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, FeedFollow, FeedFollowRow};

/// Columns shared by every follow query, joined with both display names.
const FOLLOW_COLUMNS: &str = r#"
    ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
    u.name AS user_name, f.name AS feed_name
"#;

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Link a user to a feed.
    ///
    /// At most one follow exists per (user, feed) pair; a second attempt fails
    /// with `Duplicate("feed follow")`.
    pub async fn create_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<FeedFollow, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = to_millis(Utc::now());

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(&id)
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::on_unique("feed follow"))?;

        let row: FeedFollowRow = sqlx::query_as(&format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = ?
        "#
        ))
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// Remove a follow. Fails with `NotFound("feed follow")` when none existed.
    pub async fn delete_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("feed follow"));
        }
        Ok(())
    }

    /// Every feed a user follows, oldest follow first.
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FeedFollow>, DatabaseError> {
        let rows: Vec<FeedFollowRow> = sqlx::query_as(&format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at, f.seq
        "#
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }
}
