//! Small input-validation helpers used by the command handlers.
//!
//! - **Durations**: Go-style interval strings for the `agg` command
//! - **URL validation**: scheme and host checks before a feed is stored

mod duration;
mod url_validator;

pub use duration::{parse_duration, DurationError};
pub use url_validator::{validate_feed_url, UrlValidationError};
