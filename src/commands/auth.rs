use super::{CommandError, Handler, HandlerFuture, Session};
use crate::storage::{DatabaseError, User};

/// Decorator for handlers that act on behalf of the logged-in user.
///
/// Resolves the current username from the session config, loads the user,
/// and passes it to the wrapped handler. When no user is set, or the named
/// user no longer exists, the command fails with
/// [`CommandError::NotLoggedIn`] before the inner handler runs.
pub struct RequireUser<H> {
    inner: H,
}

impl<H: Handler> RequireUser<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: Handler> Handler for RequireUser<H> {
    fn usage(&self) -> &'static str {
        self.inner.usage()
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let name = session
                .config
                .current_user
                .clone()
                .ok_or(CommandError::NotLoggedIn)?;

            let user = match session.db.get_user(&name).await {
                Ok(user) => user,
                Err(DatabaseError::NotFound(_)) => {
                    tracing::debug!(user = %name, "Configured user does not exist");
                    return Err(CommandError::NotLoggedIn);
                }
                Err(e) => return Err(e.into()),
            };

            self.inner.execute(session, args, Some(user)).await
        })
    }
}

/// Unwrap the actor injected by [`RequireUser`].
pub(crate) fn actor(actor: Option<User>) -> Result<User, CommandError> {
    actor.ok_or(CommandError::NotLoggedIn)
}
