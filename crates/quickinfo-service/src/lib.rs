mod jira;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use jira::JiraClient;

use async_trait::async_trait;
use bytes::Bytes;
use quickinfo_core::{IssueFields, IssueKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker answered with anything other than 200.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("{0}")]
    Internal(String),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::Status { status: 404, .. })
    }
}

/// Remote issue tracker operations the sync pipeline depends on.
///
/// `JiraClient` talks to a live server; tests substitute their own.
/// An empty `token` means the request goes out unauthenticated.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch_issue(
        &self,
        base_url: &str,
        token: &str,
        key: &IssueKey,
    ) -> Result<IssueFields, TrackerError>;

    async fn fetch_attachment(&self, url: &str, token: &str) -> Result<Bytes, TrackerError>;
}
