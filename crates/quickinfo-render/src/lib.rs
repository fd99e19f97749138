mod label;
mod markup;
mod tooltip;

pub use label::build_label;
pub use markup::jira_to_markdown;
pub use tooltip::build_tooltip;

use quickinfo_core::{ClickAction, IssueFields, RenderedPresentation, TrackerConfig};

/// Build everything the status surface shows for one sync cycle.
///
/// With `fields` absent the label becomes the not-found message, the tooltip
/// keeps only the browser link, and the click action is inert.
pub fn build_presentation(
    config: &TrackerConfig,
    fields: Option<&IssueFields>,
) -> RenderedPresentation {
    let tooltip = build_tooltip(&config.base_url, &config.issue_key, fields);
    match build_label(config, fields) {
        Ok(label) => RenderedPresentation {
            label,
            tooltip,
            click_action: Some(ClickAction::new(&config.base_url, &config.issue_key)),
        },
        Err(e) => RenderedPresentation {
            label: e.to_string(),
            tooltip,
            click_action: None,
        },
    }
}
