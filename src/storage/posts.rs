use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{is_unique_violation, to_millis, DatabaseError, NewPost, Post, PostInsert, PostRow};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of posts to return from any single query (OOM protection)
const MAX_POSTS: i64 = 2000;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post, treating a URL that is already stored as a no-op.
    ///
    /// Uniqueness is enforced by the `posts.url` constraint rather than a
    /// read-before-write, so concurrent writers from other processes cannot
    /// slip a duplicate in between. Any other failure is returned as-is.
    pub async fn create_post(&self, post: &NewPost) -> Result<PostInsert, DatabaseError> {
        let now = to_millis(Utc::now());
        let result: Result<PostRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
        "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(post.feed_id.to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at.map(to_millis))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(PostInsert::Inserted(row.into())),
            Err(e) if is_unique_violation(&e) => Ok(PostInsert::Duplicate),
            Err(e) => Err(DatabaseError::Other(e)),
        }
    }

    /// Posts from every feed the user follows, most recent first.
    ///
    /// Posts without a publication date sort after dated ones, newest
    /// ingestion first. `limit` is capped at [`MAX_POSTS`].
    pub async fn get_posts_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let limit = limit.clamp(0, MAX_POSTS);
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
            LIMIT ?
        "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Total number of stored posts.
    pub async fn count_posts(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
