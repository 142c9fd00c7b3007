use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::feed::fetcher::{stopped, FeedFetcher, FetchError};
use crate::feed::ingest::{ingest_items, IngestReport};
use crate::storage::{Database, DatabaseError};

/// Why a single refresh cycle did not complete.
///
/// None of these stop the loop; they are logged and the next tick proceeds.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("No feeds to fetch")]
    NoFeeds,
    #[error("Store error for {feed}: {source}")]
    Store {
        feed: String,
        #[source]
        source: DatabaseError,
    },
    #[error("Failed to fetch {feed}: {source}")]
    Fetch {
        feed: String,
        #[source]
        source: FetchError,
    },
}

/// Summary of one completed refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_name: String,
    pub feed_url: String,
    pub items: usize,
    pub ingest: IngestReport,
}

/// Periodically refreshes the least-recently-fetched feed.
///
/// One feed per tick, strictly sequential: select, mark fetched, fetch,
/// ingest. Outbound concurrency is therefore exactly one request.
pub struct Scheduler {
    db: Database,
    fetcher: FeedFetcher,
    interval: Duration,
}

impl Scheduler {
    pub fn new(db: Database, fetcher: FeedFetcher, interval: Duration) -> Self {
        Self {
            db,
            fetcher,
            interval,
        }
    }

    /// Run until `stop` becomes `true`, returning the number of cycles attempted.
    ///
    /// The first cycle starts immediately. The stop signal is honoured while
    /// waiting for a tick and while a fetch is in flight; a cycle that is
    /// already ingesting runs to completion first.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            match self.refresh_next(&mut stop).await {
                Ok(report) => {
                    tracing::info!(
                        feed = %report.feed_url,
                        items = report.items,
                        inserted = report.ingest.inserted,
                        duplicates = report.ingest.duplicates,
                        "Feed refreshed"
                    );
                }
                Err(CycleError::NoFeeds) => {
                    tracing::info!("No feeds to fetch yet");
                }
                Err(CycleError::Fetch {
                    source: FetchError::Cancelled,
                    ..
                }) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Feed refresh failed");
                }
            }
        }

        tracing::info!(cycles = cycles, "Aggregator stopped");
        cycles
    }

    /// Perform exactly one refresh cycle.
    ///
    /// The selected feed is marked fetched *before* the request goes out, so
    /// a feed that keeps failing still yields its turn to the others.
    pub async fn refresh_next(
        &self,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<CycleReport, CycleError> {
        let feed = match self.db.next_feed_to_fetch().await {
            Ok(feed) => feed,
            Err(DatabaseError::NotFound(_)) => return Err(CycleError::NoFeeds),
            Err(source) => {
                return Err(CycleError::Store {
                    feed: String::from("<selection>"),
                    source,
                })
            }
        };

        self.db
            .mark_feed_fetched(feed.id, Utc::now())
            .await
            .map_err(|source| CycleError::Store {
                feed: feed.url.clone(),
                source,
            })?;

        tracing::debug!(feed = %feed.url, name = %feed.name, "Fetching feed");
        let rss = self
            .fetcher
            .fetch(&feed.url, stop)
            .await
            .map_err(|source| CycleError::Fetch {
                feed: feed.url.clone(),
                source,
            })?;

        let ingest = ingest_items(&self.db, &feed, &rss.channel.items)
            .await
            .map_err(|source| CycleError::Store {
                feed: feed.url.clone(),
                source,
            })?;

        Ok(CycleReport {
            feed_name: feed.name,
            feed_url: feed.url,
            items: rss.channel.items.len(),
            ingest,
        })
    }
}
