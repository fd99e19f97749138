use async_trait::async_trait;
use quickinfo_core::RenderedPresentation;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::opener;
use crate::surface::{PromptRequest, StatusSurface};

/// How `TerminalSurface` prints a presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Label,
    /// Label followed by the tooltip markdown.
    Tooltip,
    Json,
}

/// Status surface for the command line: presentations go to stdout, errors
/// and prompts to stderr, answers are read from stdin.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    mode: OutputMode,
}

impl TerminalSurface {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn format(&self, presentation: &RenderedPresentation) -> String {
        match self.mode {
            OutputMode::Label => presentation.label.clone(),
            OutputMode::Tooltip => {
                format!("{}\n\n{}", presentation.label, presentation.tooltip.markdown)
            }
            OutputMode::Json => serde_json::to_string_pretty(presentation)
                .unwrap_or_else(|_| presentation.label.clone()),
        }
    }
}

#[async_trait]
impl StatusSurface for TerminalSurface {
    fn render(&self, presentation: &RenderedPresentation) {
        println!("{}", self.format(presentation));
    }

    fn report_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    async fn prompt(&self, request: PromptRequest) -> Option<String> {
        let mut stderr = tokio::io::stderr();
        let question = format!("{} (e.g. {}): ", request.prompt, request.placeholder);
        stderr.write_all(question.as_bytes()).await.ok()?;
        stderr.flush().await.ok()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        // EOF counts as a dismissed prompt.
        lines.next_line().await.ok().flatten()
    }

    async fn open_external(&self, url: &str) -> anyhow::Result<()> {
        opener::open_url(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickinfo_core::{ClickAction, Tooltip};

    fn sample() -> RenderedPresentation {
        RenderedPresentation {
            label: "K-1 | Open | Title".into(),
            tooltip: Tooltip {
                markdown: "Click to open".into(),
                trusted: true,
            },
            click_action: Some(ClickAction::new("https://jira", "K-1")),
        }
    }

    #[test]
    fn label_mode_prints_label_only() {
        let surface = TerminalSurface::new(OutputMode::Label);
        assert_eq!(surface.format(&sample()), "K-1 | Open | Title");
    }

    #[test]
    fn tooltip_mode_appends_markdown() {
        let surface = TerminalSurface::new(OutputMode::Tooltip);
        assert_eq!(
            surface.format(&sample()),
            "K-1 | Open | Title\n\nClick to open"
        );
    }

    #[test]
    fn json_mode_is_parseable() {
        let surface = TerminalSurface::new(OutputMode::Json);
        let value: serde_json::Value = serde_json::from_str(&surface.format(&sample())).unwrap();
        assert_eq!(value["label"], "K-1 | Open | Title");
        assert_eq!(value["tooltip"]["trusted"], true);
    }
}
