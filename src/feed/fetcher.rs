use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::feed::parser::{parse_feed, ParseError, RssFeed};

/// Client identifier sent with every feed request.
pub const USER_AGENT: &str = "gator";

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed.
///
/// Every variant aborts only the current feed's cycle; the scheduler logs it
/// and moves on. There is no retry: the feed waits for its next turn.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a decodable RSS document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The stop signal fired while the request was in flight
    #[error("Fetch cancelled")]
    Cancelled,
}

/// Performs single-shot feed downloads with a shared HTTP client.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    /// Build a fetcher. `timeout` of `None` leaves requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Download and decode the feed at `url`.
    ///
    /// The request races the `stop` signal: if it flips to `true` first the
    /// in-flight request is dropped and [`FetchError::Cancelled`] returned.
    pub async fn fetch(
        &self,
        url: &str,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<RssFeed, FetchError> {
        let already_stopped = *stop.borrow();
        if already_stopped {
            return Err(FetchError::Cancelled);
        }

        let bytes = tokio::select! {
            biased;
            _ = stopped(stop) => return Err(FetchError::Cancelled),
            bytes = self.download(url) => bytes?,
        };

        let feed = parse_feed(&bytes)?;
        tracing::debug!(
            feed = %url,
            title = %feed.channel.title,
            items = feed.channel.items.len(),
            "Fetched feed"
        );
        Ok(feed)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

/// Resolves once the stop flag is `true`; pends forever if the sender is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let sender_gone = stop.wait_for(|stop| *stop).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
