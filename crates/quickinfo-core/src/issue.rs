use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QuickInfoError;
use crate::setting::Setting;

/// Filename prefix the tracker gives to images pasted inline into a description.
pub const INLINE_IMAGE_PREFIX: &str = "image-";

/// Tracker-assigned identifier such as `PROJ-123`. Only non-emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn parse(raw: &str) -> Result<Self, QuickInfoError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuickInfoError::ConfigMissing(Setting::Issue));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Attachment {
    pub fn is_inline_image(&self) -> bool {
        self.filename.starts_with(INLINE_IMAGE_PREFIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentPage {
    #[serde(default, deserialize_with = "vec_or_null")]
    pub comments: Vec<serde_json::Value>,
}

/// The `fields` object of an issue, as returned by `/rest/api/2/issue/{key}`.
///
/// Optional fields stay `None` when the tracker omits them or sends `null`;
/// the description and attachment list collapse to empty values instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(rename = "attachment", default, deserialize_with = "vec_or_null")]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub comment: Option<CommentPage>,
}

impl IssueFields {
    pub fn status_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.name.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    pub fn assignee_name(&self) -> Option<&str> {
        self.assignee
            .as_ref()
            .map(|a| a.display_name.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn comment_count(&self) -> usize {
        self.comment.as_ref().map_or(0, |c| c.comments.len())
    }

    pub fn inline_images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_inline_image())
    }
}

/// Wire envelope of a single-issue response.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueResponse {
    pub fields: IssueFields,
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
