use super::{expect_args, CommandError, Handler, HandlerFuture, Session};
use crate::storage::{DatabaseError, User};

/// `register <name>`: create a user and make it current.
pub struct Register;

impl Handler for Register {
    fn usage(&self) -> &'static str {
        "gator register <name>"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 1)?;
            let name = &args[0];

            let user = session.db.create_user(name).await.map_err(|e| match e {
                DatabaseError::Duplicate(_) => {
                    CommandError::Duplicate(format!("user {name:?} already exists"))
                }
                other => other.into(),
            })?;
            session.set_current_user(&user.name)?;

            tracing::info!(user = %user.name, id = %user.id, "Registered user");
            println!("User created: {} ({})", user.name, user.id);
            Ok(())
        })
    }
}

/// `login <name>`: switch the current user to an existing one.
pub struct Login;

impl Handler for Login {
    fn usage(&self) -> &'static str {
        "gator login <name>"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 1)?;
            let name = &args[0];

            let user = session.db.get_user(name).await.map_err(|e| match e {
                DatabaseError::NotFound(_) => {
                    CommandError::NotFound(format!("{name:?} is not a registered user"))
                }
                other => other.into(),
            })?;
            session.set_current_user(&user.name)?;

            println!("Username set to {}", user.name);
            Ok(())
        })
    }
}

/// `reset`: delete every user, feed, follow and post.
pub struct Reset;

impl Handler for Reset {
    fn usage(&self) -> &'static str {
        "gator reset"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 0)?;
            session.db.reset().await?;
            println!("All users, feeds and posts have been removed");
            Ok(())
        })
    }
}

/// `users`: list every user, marking the current one.
pub struct Users;

impl Handler for Users {
    fn usage(&self) -> &'static str {
        "gator users"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 0)?;
            let current = session.config.current_user.as_deref();
            for user in session.db.get_users().await? {
                if Some(user.name.as_str()) == current {
                    println!("* {} (current)", user.name);
                } else {
                    println!("* {}", user.name);
                }
            }
            Ok(())
        })
    }
}
