//! gator: a command-line RSS feed aggregator.
//!
//! Users register, add and follow RSS feeds, and the `agg` command polls
//! followed feeds one at a time, storing new items as posts.

pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
