use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The requested row does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// Another process holds a lock on the database file
    #[error("The database is locked by another gator process. Please try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }

    /// Map a unique-constraint violation to `Duplicate(what)`, anything else to `Other`.
    pub(crate) fn on_unique(what: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |err| {
            if is_unique_violation(&err) {
                DatabaseError::Duplicate(what)
            } else {
                DatabaseError::Other(err)
            }
        }
    }
}

/// True when the store rejected a write because of a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

// ============================================================================
// Timestamp helpers
// ============================================================================

/// Timestamps are persisted as unix milliseconds so ORDER BY stays numeric.
pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn parse_id(raw: &str) -> Uuid {
    // Malformed ids only come from hand-edited databases; they read as nil.
    Uuid::parse_str(raw).unwrap_or_else(|e| {
        tracing::warn!(id = %raw, error = %e, "Malformed id in database");
        Uuid::nil()
    })
}

// ============================================================================
// Input Types
// ============================================================================

/// Fields of a post about to be ingested.
///
/// Id and timestamps are assigned by [`Database::create_post`](super::Database::create_post).
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Result of an idempotent post insert.
#[derive(Debug, Clone)]
pub enum PostInsert {
    /// The post was new and is now stored
    Inserted(Post),
    /// A post with the same URL already exists; nothing was written
    Duplicate,
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: parse_id(&row.id),
            name: row.name,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub user_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_fetched_at: Option<i64>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: parse_id(&row.id),
            name: row.name,
            url: row.url,
            user_id: parse_id(&row.user_id),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
            last_fetched_at: row.last_fetched_at.map(from_millis),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedListingRow {
    pub name: String,
    pub url: String,
    pub creator: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedFollowRow {
    pub id: String,
    pub user_id: String,
    pub feed_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_name: String,
    pub feed_name: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: parse_id(&row.id),
            user_id: parse_id(&row.user_id),
            feed_id: parse_id(&row.feed_id),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
            user_name: row.user_name,
            feed_name: row.feed_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub feed_id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: parse_id(&row.id),
            feed_id: parse_id(&row.feed_id),
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.map(from_millis),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// The user who added the feed
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` until the scheduler first picks the feed
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// A feed as shown by the `feeds` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedListing {
    pub name: String,
    pub url: String,
    pub creator: String,
}

impl From<FeedListingRow> for FeedListing {
    fn from(row: FeedListingRow) -> Self {
        FeedListing {
            name: row.name,
            url: row.url,
            creator: row.creator,
        }
    }
}

/// A user/feed follow, joined with both display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub feed_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    /// Unique across all posts; the dedup key for ingestion
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
