use crate::feed::dates::normalize_date;
use crate::feed::parser::RssItem;
use crate::storage::{Database, DatabaseError, Feed, NewPost, PostInsert};

/// Outcome of ingesting one fetch worth of items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Build the post record for one fetched item.
///
/// An empty or whitespace-only description is stored as absent, as is a
/// publication date no layout recognises.
pub fn to_new_post(feed: &Feed, item: &RssItem) -> NewPost {
    let description = item
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string);

    NewPost {
        feed_id: feed.id,
        title: item.title.clone(),
        url: item.link.clone(),
        description,
        published_at: normalize_date(item.pub_date.as_deref()),
    }
}

/// Store every item of a fetch as a post of `feed`.
///
/// Items whose URL is already stored are counted as duplicates and skipped
/// silently. Any other store error stops ingestion immediately; the items
/// after the failing one are not attempted.
pub async fn ingest_items(
    db: &Database,
    feed: &Feed,
    items: &[RssItem],
) -> Result<IngestReport, DatabaseError> {
    let mut report = IngestReport::default();

    for item in items {
        match db.create_post(&to_new_post(feed, item)).await? {
            PostInsert::Inserted(post) => {
                report.inserted += 1;
                tracing::debug!(feed = %feed.url, post = %post.url, "Saved post");
                println!("Saved post: {}", post.title);
            }
            PostInsert::Duplicate => {
                report.duplicates += 1;
                tracing::trace!(feed = %feed.url, post = %item.link, "Post already stored");
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> (Database, Feed) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("blog", "https://example.com/feed.xml", user.id)
            .await
            .unwrap();
        (db, feed)
    }

    fn item(link: &str, description: Option<&str>, pub_date: Option<&str>) -> RssItem {
        RssItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            description: description.map(str::to_string),
            pub_date: pub_date.map(str::to_string),
        }
    }

    #[test]
    fn test_to_new_post_normalizes_optional_fields() {
        let feed = Feed {
            id: uuid::Uuid::new_v4(),
            name: "f".into(),
            url: "https://e.com/rss".into(),
            user_id: uuid::Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            last_fetched_at: None,
        };

        let post = to_new_post(&feed, &item("https://e.com/a", Some("  "), Some("not a date")));
        assert_eq!(post.description, None);
        assert_eq!(post.published_at, None);
        assert_eq!(post.feed_id, feed.id);

        let post = to_new_post(&feed, &item("https://e.com/b", Some("hello"), Some("2024-03-01")));
        assert_eq!(post.description.as_deref(), Some("hello"));
        assert!(post.published_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicates_are_skipped_not_errors() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/a", None, None),
            item("https://example.com/b", Some("b"), Some("2024-01-01")),
        ];

        let first = ingest_items(&db, &feed, &items).await.unwrap();
        assert_eq!(first, IngestReport { inserted: 2, duplicates: 0 });

        let second = ingest_items(&db, &feed, &items).await.unwrap();
        assert_eq!(second, IngestReport { inserted: 0, duplicates: 2 });

        assert_eq!(db.count_posts().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_within_one_fetch() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/same", None, None),
            item("https://example.com/same", None, None),
        ];

        let report = ingest_items(&db, &feed, &items).await.unwrap();
        assert_eq!(report, IngestReport { inserted: 1, duplicates: 1 });
    }

    #[tokio::test]
    async fn test_store_error_stops_remaining_items() {
        let (db, feed) = setup().await;
        // Non-unique failure for one URL only
        sqlx::query(
            r#"
            CREATE TRIGGER reject_poison BEFORE INSERT ON posts
            WHEN NEW.url = 'https://example.com/poison'
            BEGIN SELECT RAISE(ABORT, 'rejected'); END
        "#,
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let items = vec![
            item("https://example.com/before", None, None),
            item("https://example.com/poison", None, None),
            item("https://example.com/after", None, None),
        ];

        let result = ingest_items(&db, &feed, &items).await;
        assert!(matches!(result, Err(DatabaseError::Other(_))));

        // The item before the failure is kept; the one after was never attempted
        assert_eq!(db.count_posts().await.unwrap(), 1);
        let retry = ingest_items(&db, &feed, &items[2..]).await.unwrap();
        assert_eq!(retry, IngestReport { inserted: 1, duplicates: 0 });
    }
}
