use serde::{Deserialize, Serialize};

/// Target of a click on the rendered label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickAction {
    pub base_url: String,
    pub issue_key: String,
}

impl ClickAction {
    pub fn new(base_url: &str, issue_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            issue_key: issue_key.to_string(),
        }
    }

    pub fn browse_url(&self) -> String {
        browse_url(&self.base_url, &self.issue_key)
    }
}

/// `{base}/browse/{key}`, tolerating a trailing slash on the base URL.
pub fn browse_url(base_url: &str, issue_key: &str) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), issue_key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub markdown: String,
    /// Trusted tooltips may render local-file image links inline.
    pub trusted: bool,
}

/// What the host surface shows for the current issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPresentation {
    pub label: String,
    pub tooltip: Tooltip,
    /// `None` when the label carries an error and clicking should do nothing.
    pub click_action: Option<ClickAction>,
}
