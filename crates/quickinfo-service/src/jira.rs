use async_trait::async_trait;
use bytes::Bytes;
use quickinfo_core::{IssueFields, IssueKey, IssueResponse};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::{IssueTracker, TrackerError};

/// REST v2 client for a Jira-style tracker.
///
/// Certificate validation is disabled: internal trackers commonly sit behind
/// a private CA that the system trust store doesn't know about.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
}

impl JiraClient {
    pub fn new() -> Result<Self, TrackerError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .user_agent("quickinfo")
            .build()
            .map_err(|e| TrackerError::Internal(format!("HTTP client init: {e}")))?;
        Ok(Self { client })
    }

    pub fn issue_url(base_url: &str, key: &IssueKey) -> String {
        format!(
            "{}/rest/api/2/issue/{}",
            base_url.trim_end_matches('/'),
            key.as_str()
        )
    }

    fn with_auth(builder: RequestBuilder, token: &str) -> RequestBuilder {
        if token.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {token}"))
        }
    }

    async fn get(&self, url: &str, token: &str) -> Result<reqwest::Response, TrackerError> {
        let resp = Self::with_auth(self.client.get(url), token)
            .send()
            .await
            .map_err(|e| TrackerError::Transport {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        // Only an exact 200 counts as success.
        if resp.status() != StatusCode::OK {
            return Err(TrackerError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn fetch_issue(
        &self,
        base_url: &str,
        token: &str,
        key: &IssueKey,
    ) -> Result<IssueFields, TrackerError> {
        let url = Self::issue_url(base_url, key);
        debug!("GET {url}");
        let resp = self.get(&url, token).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| TrackerError::Transport {
                url: url.clone(),
                detail: format!("read body: {e}"),
            })?;
        let issue: IssueResponse =
            serde_json::from_slice(&body).map_err(|e| TrackerError::Decode {
                url: url.clone(),
                detail: e.to_string(),
            })?;
        Ok(issue.fields)
    }

    async fn fetch_attachment(&self, url: &str, token: &str) -> Result<Bytes, TrackerError> {
        debug!("GET {url}");
        let resp = self.get(url, token).await?;
        resp.bytes().await.map_err(|e| TrackerError::Transport {
            url: url.to_string(),
            detail: format!("read body: {e}"),
        })
    }
}
