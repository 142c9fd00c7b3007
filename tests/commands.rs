//! Integration tests for command routing and the logged-in-user decorator.
//!
//! Each test gets an in-memory database and a private config file in the
//! system temp directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use gator::commands::{CommandError, CommandRegistry, Session};
use gator::config::{Config, CONFIG_FILE_NAME};
use gator::feed::FeedFetcher;
use gator::storage::Database;

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

struct Harness {
    session: Session,
    registry: CommandRegistry,
    dir: PathBuf,
    _stop_tx: watch::Sender<bool>,
}

impl Harness {
    async fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "gator_commands_test_{}_{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join(CONFIG_FILE_NAME);

        let db = Database::open(":memory:").await.unwrap();
        let fetcher = FeedFetcher::new(None).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            session: Session::new(db, Config::default(), config_path, fetcher, stop_rx),
            registry: CommandRegistry::with_defaults(),
            dir,
            _stop_tx: stop_tx,
        }
    }

    async fn run(&mut self, name: &str, args: &[&str]) -> Result<(), CommandError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.registry.run(&mut self.session, name, &args).await
    }

    fn db(&self) -> &Database {
        &self.session.db
    }

    async fn counts(&self) -> (usize, usize, i64) {
        let users = self.db().get_users().await.unwrap().len();
        let feeds = self.db().get_feeds().await.unwrap().len();
        let posts = self.db().count_posts().await.unwrap();
        (users, feeds, posts)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_command_is_rejected() {
    let mut h = Harness::new().await;
    let result = h.run("frobnicate", &[]).await;
    assert!(matches!(result, Err(CommandError::UnrecognizedCommand(name)) if name == "frobnicate"));
}

#[tokio::test]
async fn test_help_lists_commands() {
    let mut h = Harness::new().await;
    assert!(h.run("help", &[]).await.is_ok());
}

#[tokio::test]
async fn test_wrong_argument_count_is_usage_error() {
    let mut h = Harness::new().await;
    assert!(matches!(h.run("register", &[]).await, Err(CommandError::Usage(_))));
    assert!(matches!(
        h.run("login", &["a", "b"]).await,
        Err(CommandError::Usage(_))
    ));
    assert!(matches!(h.run("users", &["x"]).await, Err(CommandError::Usage(_))));
    assert_eq!(h.counts().await, (0, 0, 0));
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_creates_user_and_logs_in() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    assert_eq!(h.session.config.current_user.as_deref(), Some("alice"));
    let saved = Config::load(&h.session.config_path).unwrap();
    assert_eq!(saved.current_user.as_deref(), Some("alice"));
    assert_eq!(h.counts().await.0, 1);
}

#[tokio::test]
async fn test_register_duplicate_fails() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    let result = h.run("register", &["alice"]).await;
    assert!(matches!(result, Err(CommandError::Duplicate(_))));
    assert_eq!(h.counts().await.0, 1);
}

#[tokio::test]
async fn test_login_unknown_user_fails_and_keeps_current() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    let result = h.run("login", &["mallory"]).await;
    assert!(matches!(result, Err(CommandError::NotFound(_))));
    assert_eq!(h.session.config.current_user.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_login_switches_user() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();
    h.run("register", &["bob"]).await.unwrap();

    h.run("login", &["alice"]).await.unwrap();
    assert_eq!(h.session.config.current_user.as_deref(), Some("alice"));
    h.run("users", &[]).await.unwrap();
}

// ============================================================================
// Logged-in-user Decorator
// ============================================================================

#[tokio::test]
async fn test_protected_commands_require_login() {
    let mut h = Harness::new().await;
    let cases: [(&str, &[&str]); 5] = [
        ("addfeed", &["Blog", "https://example.com/feed.xml"]),
        ("follow", &["https://example.com/feed.xml"]),
        ("following", &[]),
        ("unfollow", &["https://example.com/feed.xml"]),
        ("browse", &[]),
    ];

    for (name, args) in cases {
        let result = h.run(name, args).await;
        assert!(
            matches!(result, Err(CommandError::NotLoggedIn)),
            "{name} should require login"
        );
    }
    assert_eq!(h.counts().await, (0, 0, 0));
}

#[tokio::test]
async fn test_protected_command_with_stale_user_requires_login() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();
    h.run("reset", &[]).await.unwrap();

    // Config still names alice, but the user no longer exists
    let result = h.run("addfeed", &["Blog", "https://example.com/feed.xml"]).await;
    assert!(matches!(result, Err(CommandError::NotLoggedIn)));
    assert_eq!(h.counts().await, (0, 0, 0));
}

// ============================================================================
// Feeds & Follows
// ============================================================================

#[tokio::test]
async fn test_addfeed_follows_automatically() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();
    h.run("addfeed", &["Blog", "https://example.com/feed.xml"])
        .await
        .unwrap();

    let user = h.db().get_user("alice").await.unwrap();
    let follows = h.db().get_feed_follows_for_user(user.id).await.unwrap();
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].feed_name, "Blog");

    let feeds = h.db().get_feeds().await.unwrap();
    assert_eq!(feeds[0].creator, "alice");
}

#[tokio::test]
async fn test_addfeed_rejects_bad_url_without_writing() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    let result = h.run("addfeed", &["Blog", "ftp://example.com/feed"]).await;
    assert!(matches!(result, Err(CommandError::InvalidUrl(_))));
    assert_eq!(h.counts().await.1, 0);
}

#[tokio::test]
async fn test_addfeed_duplicate_url_fails() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();
    h.run("addfeed", &["Blog", "https://example.com/feed.xml"])
        .await
        .unwrap();

    let result = h
        .run("addfeed", &["Other", "https://example.com/feed.xml"])
        .await;
    assert!(matches!(result, Err(CommandError::Duplicate(_))));
    assert_eq!(h.counts().await.1, 1);
}

#[tokio::test]
async fn test_follow_and_unfollow_another_users_feed() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();
    h.run("addfeed", &["Blog", "https://example.com/feed.xml"])
        .await
        .unwrap();
    h.run("register", &["bob"]).await.unwrap();

    h.run("follow", &["https://example.com/feed.xml"]).await.unwrap();
    let bob = h.db().get_user("bob").await.unwrap();
    assert_eq!(h.db().get_feed_follows_for_user(bob.id).await.unwrap().len(), 1);

    assert!(matches!(
        h.run("follow", &["https://example.com/feed.xml"]).await,
        Err(CommandError::Duplicate(_))
    ));

    h.run("unfollow", &["https://example.com/feed.xml"]).await.unwrap();
    assert!(h.db().get_feed_follows_for_user(bob.id).await.unwrap().is_empty());

    assert!(matches!(
        h.run("unfollow", &["https://example.com/feed.xml"]).await,
        Err(CommandError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_follow_unknown_feed_not_found() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    let result = h.run("follow", &["https://nowhere.example/feed"]).await;
    assert!(matches!(result, Err(CommandError::NotFound(_))));
}

#[tokio::test]
async fn test_browse_rejects_bad_limit() {
    let mut h = Harness::new().await;
    h.run("register", &["alice"]).await.unwrap();

    assert!(h.run("browse", &[]).await.is_ok());
    assert!(matches!(
        h.run("browse", &["lots"]).await,
        Err(CommandError::Usage(_))
    ));
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_agg_rejects_bad_interval() {
    let mut h = Harness::new().await;
    for bad in ["soon", "10", "0s"] {
        assert!(matches!(
            h.run("agg", &[bad]).await,
            Err(CommandError::Usage(_))
        ));
    }
    assert!(matches!(h.run("agg", &[]).await, Err(CommandError::Usage(_))));
}
