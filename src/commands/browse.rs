use super::auth::actor;
use super::{CommandError, Handler, HandlerFuture, Session};
use crate::storage::User;

/// Number of posts shown when `browse` is given no limit.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// `browse [limit]`: newest posts from followed feeds.
pub struct Browse;

impl Browse {
    fn limit(&self, args: &[String]) -> Result<i64, CommandError> {
        match args {
            [] => Ok(DEFAULT_BROWSE_LIMIT),
            [raw] => match raw.parse::<i64>() {
                Ok(limit) if limit > 0 => Ok(limit),
                _ => Err(CommandError::Usage(format!(
                    "{} (limit must be a positive integer)",
                    self.usage()
                ))),
            },
            _ => Err(CommandError::Usage(self.usage().to_string())),
        }
    }
}

impl Handler for Browse {
    fn usage(&self) -> &'static str {
        "gator browse [limit]"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        actor_user: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let user = actor(actor_user)?;
            let limit = self.limit(args)?;

            for post in session.db.get_posts_for_user(user.id, limit).await? {
                println!("---");
                println!("{}", post.title);
                println!("{}", post.url);
                match post.published_at {
                    Some(ts) => println!("{}", ts.format("%Y-%m-%d %H:%M UTC")),
                    None => println!("(no date)"),
                }
                if let Some(description) = post.description {
                    println!("{description}");
                }
            }
            Ok(())
        })
    }
}
