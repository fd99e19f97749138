//! The host surface the controller draws on.
//!
//! A surface shows the rendered label and tooltip, shows error messages,
//! asks the user for text input and opens URLs. The CLI implementation lives
//! in [`crate::terminal`]; tests use a recording fake.

use async_trait::async_trait;
use quickinfo_core::RenderedPresentation;

/// Text-input request shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRequest {
    pub prompt: &'static str,
    pub placeholder: &'static str,
}

impl PromptRequest {
    pub fn issue() -> Self {
        Self {
            prompt: "Issue key",
            placeholder: "ABC-123",
        }
    }

    pub fn url() -> Self {
        Self {
            prompt: "Tracker base URL",
            placeholder: "https://jira.example.com",
        }
    }
}

#[async_trait]
pub trait StatusSurface: Send + Sync {
    /// Replace whatever is currently shown with `presentation`.
    fn render(&self, presentation: &RenderedPresentation);

    fn report_error(&self, message: &str);

    /// `None` when the user dismissed the prompt.
    async fn prompt(&self, request: PromptRequest) -> Option<String>;

    async fn open_external(&self, url: &str) -> anyhow::Result<()>;
}
