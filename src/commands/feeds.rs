use super::auth::actor;
use super::{expect_args, CommandError, Handler, HandlerFuture, Session};
use crate::storage::{Database, DatabaseError, Feed, User};
use crate::util::validate_feed_url;

async fn feed_by_url(db: &Database, url: &str) -> Result<Feed, CommandError> {
    db.get_feed_by_url(url).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => CommandError::NotFound(format!("no feed with URL {url}")),
        other => other.into(),
    })
}

fn already_following(e: DatabaseError, url: &str) -> CommandError {
    match e {
        DatabaseError::Duplicate(_) => {
            CommandError::Duplicate(format!("you already follow {url}"))
        }
        other => other.into(),
    }
}

/// `addfeed <name> <url>`: create a feed and follow it as its creator.
pub struct AddFeed;

impl Handler for AddFeed {
    fn usage(&self) -> &'static str {
        "gator addfeed <name> <url>"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor_user: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let user = actor(actor_user)?;
            expect_args(self, args, 2)?;
            let (name, url) = (&args[0], &args[1]);
            validate_feed_url(url)?;

            let feed = session
                .db
                .create_feed(name, url, user.id)
                .await
                .map_err(|e| match e {
                    DatabaseError::Duplicate(_) => {
                        CommandError::Duplicate(format!("a feed with URL {url} already exists"))
                    }
                    other => other.into(),
                })?;
            let follow = session
                .db
                .create_feed_follow(user.id, feed.id)
                .await
                .map_err(|e| already_following(e, url))?;

            tracing::info!(feed = %feed.url, user = %user.name, "Added feed");
            println!("Feed added: {} ({})", feed.name, feed.url);
            println!("{} now follows {}", follow.user_name, follow.feed_name);
            Ok(())
        })
    }
}

/// `feeds`: list every feed with its creator.
pub struct Feeds;

impl Handler for Feeds {
    fn usage(&self) -> &'static str {
        "gator feeds"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 0)?;
            for feed in session.db.get_feeds().await? {
                println!("* {} <{}> added by {}", feed.name, feed.url, feed.creator);
            }
            Ok(())
        })
    }
}

/// `follow <url>`: follow an existing feed.
pub struct Follow;

impl Handler for Follow {
    fn usage(&self) -> &'static str {
        "gator follow <url>"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor_user: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let user = actor(actor_user)?;
            expect_args(self, args, 1)?;
            let url = &args[0];

            let feed = feed_by_url(&session.db, url).await?;
            let follow = session
                .db
                .create_feed_follow(user.id, feed.id)
                .await
                .map_err(|e| already_following(e, url))?;

            println!("feed name: {}", follow.feed_name);
            println!("user: {}", follow.user_name);
            Ok(())
        })
    }
}

/// `following`: list the feeds the current user follows.
pub struct Following;

impl Handler for Following {
    fn usage(&self) -> &'static str {
        "gator following"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor_user: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let user = actor(actor_user)?;
            expect_args(self, args, 0)?;
            for follow in session.db.get_feed_follows_for_user(user.id).await? {
                println!("* {}", follow.feed_name);
            }
            Ok(())
        })
    }
}

/// `unfollow <url>`: stop following a feed.
pub struct Unfollow;

impl Handler for Unfollow {
    fn usage(&self) -> &'static str {
        "gator unfollow <url>"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor_user: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let user = actor(actor_user)?;
            expect_args(self, args, 1)?;
            let url = &args[0];

            let feed = feed_by_url(&session.db, url).await?;
            session
                .db
                .delete_feed_follow(user.id, feed.id)
                .await
                .map_err(|e| match e {
                    DatabaseError::NotFound(_) => {
                        CommandError::NotFound(format!("you do not follow {url}"))
                    }
                    other => other.into(),
                })?;

            println!("Unfollowed {}", feed.name);
            Ok(())
        })
    }
}
