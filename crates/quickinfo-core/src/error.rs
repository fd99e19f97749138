use thiserror::Error;

use crate::setting::Setting;

/// Failures surfaced by the sync pipeline.
///
/// Every variant is caught at a component boundary and reported once;
/// none of them aborts the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuickInfoError {
    #[error("setting '{0}' is not configured")]
    ConfigMissing(Setting),

    #[error("{0}")]
    CredentialUnavailable(String),

    #[error("Unable to reach {base_url} with your PAT at {token_path}: {detail}")]
    RemoteUnreachable {
        base_url: String,
        token_path: String,
        detail: String,
    },

    #[error("Can't find issue {issue_key} at {base_url}. (Check your PAT at {token_path}, the URL or your issue number)")]
    IssueNotFound {
        issue_key: String,
        base_url: String,
        token_path: String,
    },

    #[error("Unable to download image {filename}: {detail}")]
    ImageDownloadFailed { filename: String, detail: String },
}
