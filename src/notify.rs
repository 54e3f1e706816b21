//! Completion notification
//!
//! On reaching a terminal state a job sends one summary message to the
//! configured endpoint: a short-lived TCP connection carrying a single
//! newline-terminated JSON message, answered by one acknowledgement line.
//! The whole exchange runs under one bounded timeout and is best-effort: any
//! failure is logged and swallowed, never retried, and never affects the job
//! outcome.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Summary delivered to the notification endpoint
///
/// `total_items_saved` counts records that reached the sink, after dedupe;
/// `total_items_scraped` counts every extracted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub status: String,
    pub total_items_scraped: u64,
    pub total_items_saved: u64,
    pub total_pages_scraped: u64,
}

/// Best-effort point-to-point notification sender
#[derive(Debug, Clone)]
pub struct NotificationClient {
    timeout: Duration,
}

impl Default for NotificationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationClient {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Delivers the summary to `endpoint`, best-effort
    ///
    /// Exactly one attempt; the caller observes no outcome beyond the logs.
    pub async fn notify(&self, endpoint: &str, summary: &CrawlSummary) {
        match tokio::time::timeout(self.timeout, self.exchange(endpoint, summary)).await {
            Ok(Ok(ack)) => {
                tracing::info!(%endpoint, %ack, "Completion notification acknowledged");
            }
            Ok(Err(e)) => {
                tracing::warn!(%endpoint, "Failed to deliver completion notification: {e}");
            }
            Err(_) => {
                tracing::warn!(
                    %endpoint,
                    timeout_secs = self.timeout.as_secs(),
                    "Completion notification timed out"
                );
            }
        }
    }

    async fn exchange(&self, endpoint: &str, summary: &CrawlSummary) -> crate::Result<String> {
        let mut stream = TcpStream::connect(endpoint).await?;

        let mut message = serde_json::to_vec(summary)?;
        message.push(b'\n');
        stream.write_all(&message).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut ack = String::new();
        reader.read_line(&mut ack).await?;
        Ok(ack.trim().to_string())
    }
}
