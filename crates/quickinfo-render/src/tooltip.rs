use quickinfo_core::{browse_url, IssueFields, Tooltip};

use crate::markup::jira_to_markdown;

/// Hover document: browser link, comment/attachment counts, a rule, then the
/// description as markdown. With `fields` absent only the link line remains.
///
/// Always trusted, so `file://` images from the cache render inline.
pub fn build_tooltip(base_url: &str, issue_key: &str, fields: Option<&IssueFields>) -> Tooltip {
    let url = browse_url(base_url, issue_key);
    let mut md = format!("Click to open [{url}]({url})\n\n");

    if let Some(fields) = fields {
        md.push_str(&format!(
            "__{} comments, {} attachments__\n\n",
            fields.comment_count(),
            fields.attachments.len()
        ));
        md.push_str("---\n\n");
        md.push_str(&jira_to_markdown(&fields.description));
    }

    Tooltip {
        markdown: md,
        trusted: true,
    }
}
