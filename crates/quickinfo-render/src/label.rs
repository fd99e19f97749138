use quickinfo_core::{IssueFields, QuickInfoError, TrackerConfig};

/// `KEY | Status | Summary ( Assignee )`, dropping each absent segment
/// together with its separator.
///
/// Absent `fields` is `QuickInfoError::IssueNotFound`; its message is meant
/// to be shown as the label so the surface never goes blank.
pub fn build_label(
    config: &TrackerConfig,
    fields: Option<&IssueFields>,
) -> Result<String, QuickInfoError> {
    let Some(fields) = fields else {
        return Err(QuickInfoError::IssueNotFound {
            issue_key: config.issue_key.clone(),
            base_url: config.base_url.clone(),
            token_path: config.token_path.clone(),
        });
    };

    let mut segments = vec![config.issue_key.as_str()];
    segments.extend(fields.status_name());
    segments.extend(fields.summary());
    let mut label = segments.join(" | ");

    if let Some(assignee) = fields.assignee_name() {
        label.push_str(&format!(" ( {assignee} )"));
    }
    Ok(label)
}
