//! Feed aggregation engine.
//!
//! - [`parser`] - RSS 2.0 decoding into a typed channel/item document
//! - [`dates`] - Ordered-layout publication date normalization
//! - [`fetcher`] - Single-shot HTTP retrieval with a stop signal
//! - [`ingest`] - Idempotent conversion of items into stored posts
//! - [`scheduler`] - The periodic least-recently-fetched refresh loop
//!
//! Data flows scheduler → store selection → fetcher → dates (per item) →
//! ingest → store insert.

pub mod dates;
pub mod fetcher;
pub mod ingest;
pub mod parser;
pub mod scheduler;

pub use dates::{match_layout, normalize_date, DateLayout};
pub use fetcher::{FeedFetcher, FetchError, USER_AGENT};
pub use ingest::{ingest_items, IngestReport};
pub use parser::{parse_feed, ParseError, RssChannel, RssFeed, RssItem};
pub use scheduler::{CycleError, CycleReport, Scheduler};
