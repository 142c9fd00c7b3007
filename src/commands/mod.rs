//! Command routing.
//!
//! A [`CommandRegistry`] maps a verb to a [`Handler`]. Handlers that need a
//! logged-in user are wrapped in [`RequireUser`], which resolves the current
//! user once and injects it, so no handler repeats the lookup.
//!
//! The active user travels in the explicit [`Session`] value rather than in
//! process-global state; the store itself stays free of session state.

mod agg;
mod auth;
mod browse;
mod feeds;
mod users;

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::{Config, ConfigError};
use crate::feed::FeedFetcher;
use crate::storage::{Database, DatabaseError, User};
use crate::util::UrlValidationError;

pub use agg::Agg;
pub use auth::RequireUser;
pub use browse::{Browse, DEFAULT_BROWSE_LIMIT};
pub use feeds::{AddFeed, Feeds, Follow, Following, Unfollow};
pub use users::{Login, Register, Reset, Users};

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported to the operator. Any of these makes the process exit non-zero.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Wrong argument count or shape; nothing was written
    #[error("usage: {0}")]
    Usage(String),

    #[error("not logged in: run `gator login <name>` or `gator register <name>` first")]
    NotLoggedIn,

    #[error("unrecognized command {0:?} (run `gator help` for a list)")]
    UnrecognizedCommand(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),

    #[error(transparent)]
    Store(DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<DatabaseError> for CommandError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(_) => CommandError::NotFound(err.to_string()),
            DatabaseError::Duplicate(_) => CommandError::Duplicate(err.to_string()),
            other => CommandError::Store(other),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything a handler may touch during one invocation.
pub struct Session {
    pub db: Database,
    pub config: Config,
    /// Where `config` is persisted when the active user changes
    pub config_path: PathBuf,
    pub fetcher: FeedFetcher,
    /// Flips to `true` on shutdown; long-running commands watch it
    pub stop: watch::Receiver<bool>,
}

impl Session {
    pub fn new(
        db: Database,
        config: Config,
        config_path: PathBuf,
        fetcher: FeedFetcher,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            config,
            config_path,
            fetcher,
            stop,
        }
    }

    /// Make `name` the active user and persist the config.
    pub fn set_current_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.config.set_user(name, &self.config_path)
    }
}

// ============================================================================
// Handler
// ============================================================================

pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), CommandError>>;

/// A command implementation.
///
/// `actor` is the resolved current user when the handler is wrapped in
/// [`RequireUser`], and `None` otherwise.
pub trait Handler: Send + Sync {
    /// One-line usage, e.g. `gator follow <url>`.
    fn usage(&self) -> &'static str;

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor: Option<User>,
    ) -> HandlerFuture<'a>;
}

/// Fail with the handler's usage line unless exactly `n` arguments were given.
pub(crate) fn expect_args(
    handler: &dyn Handler,
    args: &[String],
    n: usize,
) -> Result<(), CommandError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(CommandError::Usage(handler.usage().to_string()))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps command names to handlers.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Box<dyn Handler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full `gator` command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("register", Register);
        registry.register("login", Login);
        registry.register("reset", Reset);
        registry.register("users", Users);
        registry.register("agg", Agg);
        registry.register("feeds", Feeds);
        registry.register("addfeed", RequireUser::new(AddFeed));
        registry.register("follow", RequireUser::new(Follow));
        registry.register("following", RequireUser::new(Following));
        registry.register("unfollow", RequireUser::new(Unfollow));
        registry.register("browse", RequireUser::new(Browse));
        registry
    }

    /// Register `handler` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: &'static str, handler: impl Handler + 'static) {
        self.handlers.insert(name, Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// `name: usage` lines sorted by command name.
    pub fn usage_lines(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|(name, handler)| format!("* {name}: {}", handler.usage()))
            .collect()
    }

    /// Dispatch `name` with `args`. `help` lists every registered command.
    pub async fn run(
        &self,
        session: &mut Session,
        name: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        if name == "help" {
            for line in self.usage_lines() {
                println!("{line}");
            }
            return Ok(());
        }

        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CommandError::UnrecognizedCommand(name.to_string()))?;

        tracing::debug!(command = %name, args = args.len(), "Dispatching command");
        handler.execute(session, args, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_every_command() {
        let registry = CommandRegistry::with_defaults();
        for name in [
            "register",
            "login",
            "reset",
            "users",
            "agg",
            "addfeed",
            "feeds",
            "follow",
            "following",
            "unfollow",
            "browse",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("nonsense"));
    }

    #[test]
    fn test_usage_lines_sorted() {
        let registry = CommandRegistry::with_defaults();
        let lines = registry.usage_lines();
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("* addfeed:"));
        assert!(lines.iter().any(|l| l == "* follow: gator follow <url>"));
    }

    #[test]
    fn test_database_errors_map_to_operator_classes() {
        assert!(matches!(
            CommandError::from(DatabaseError::NotFound("user")),
            CommandError::NotFound(_)
        ));
        assert!(matches!(
            CommandError::from(DatabaseError::Duplicate("feed")),
            CommandError::Duplicate(_)
        ));
        assert!(matches!(
            CommandError::from(DatabaseError::InstanceLocked),
            CommandError::Store(_)
        ));
    }
}
