use super::{expect_args, CommandError, Handler, HandlerFuture, Session};
use crate::feed::Scheduler;
use crate::storage::User;
use crate::util::parse_duration;

/// `agg <interval>`: run the refresh loop until the process is told to stop.
pub struct Agg;

impl Handler for Agg {
    fn usage(&self) -> &'static str {
        "gator agg <interval>  (e.g. 30s, 1m, 1h30m)"
    }

    fn execute<'a>(
        &'a self,
        session: &'a mut Session,
        args: &'a [String],
        _actor: Option<User>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            expect_args(self, args, 1)?;
            let interval = parse_duration(&args[0])
                .map_err(|e| CommandError::Usage(format!("{} ({e})", self.usage())))?;

            println!("Collecting feeds every {}", args[0]);
            tracing::info!(interval = ?interval, "Starting aggregator");

            let scheduler = Scheduler::new(session.db.clone(), session.fetcher.clone(), interval);
            scheduler.run(session.stop.clone()).await;
            Ok(())
        })
    }
}
