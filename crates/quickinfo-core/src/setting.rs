use std::fmt;

use serde::{Deserialize, Serialize};

/// The three settings the tracker integration consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setting {
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "issue")]
    Issue,
    #[serde(rename = "tokenPath")]
    TokenPath,
}

impl Setting {
    pub const ALL: &[Setting] = &[Setting::Url, Setting::Issue, Setting::TokenPath];

    pub fn as_str(&self) -> &'static str {
        match self {
            Setting::Url => "url",
            Setting::Issue => "issue",
            Setting::TokenPath => "tokenPath",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "url" => Some(Setting::Url),
            "issue" => Some(Setting::Issue),
            "tokenPath" | "token_path" | "token-path" => Some(Setting::TokenPath),
            _ => None,
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a setting value lives. Folder scopes are indexed in workspace folder order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Folder(usize),
    Workspace,
    Global,
}

impl Scope {
    pub fn display_name(&self) -> String {
        match self {
            Scope::Folder(i) => format!("folder #{i}"),
            Scope::Workspace => "workspace".to_string(),
            Scope::Global => "global".to_string(),
        }
    }
}

/// Resolved tracker settings. A missing value is an empty string, never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub issue_key: String,
    pub token_path: String,
}

impl TrackerConfig {
    /// Both the URL and the issue key are needed before a sync can run.
    pub fn is_syncable(&self) -> bool {
        !self.base_url.is_empty() && !self.issue_key.is_empty()
    }
}
