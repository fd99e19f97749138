//! Inline image markers in tracker markup.
//!
//! Marker grammar:
//!
//! ```text
//! marker  = "!" name [ "|" options ] "!"
//! name    = 1*( any char except "!", "|", newline ), not starting with whitespace
//! options = *( any char except "!", newline )
//! ```
//!
//! A marker whose `name` is the filename of an inline-image attachment is
//! pointed at the cached copy; `|options` is carried over verbatim. Every
//! other marker, and all surrounding text, is left byte-for-byte unchanged.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use quickinfo_core::{Attachment, IssueFields};
use regex::Regex;

use crate::ImageCache;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"!([^!|\s][^!|\n]*)(\|[^!\n]*)?!").expect("valid marker pattern")
    })
}

/// Rewrite image markers in `description` to reference files in `cache`.
///
/// Idempotent: a rewritten marker names a `file://` URI, which never matches
/// an attachment filename, so a second pass changes nothing.
pub fn rewrite_description<'a>(
    description: &'a str,
    attachments: &[Attachment],
    cache: &ImageCache,
) -> Cow<'a, str> {
    let images: HashMap<&str, &str> = attachments
        .iter()
        .filter(|a| a.is_inline_image())
        .map(|a| (a.filename.as_str(), a.filename.as_str()))
        .collect();
    if images.is_empty() {
        return Cow::Borrowed(description);
    }

    // A candidate that names no attachment may have opened on a stray `!`
    // in prose, so scanning resumes right after that `!` rather than after
    // the whole candidate.
    let mut out = String::with_capacity(description.len());
    let mut pos = 0;
    let mut changed = false;
    while let Some(caps) = marker_regex().captures_at(description, pos) {
        let Some(whole) = caps.get(0) else { break };
        match images.get(&caps[1]).and_then(|f| cache.file_uri(f).ok()) {
            Some(uri) => {
                let options = caps.get(2).map_or("", |m| m.as_str());
                out.push_str(&description[pos..whole.start()]);
                out.push('!');
                out.push_str(&uri);
                out.push_str(options);
                out.push('!');
                pos = whole.end();
                changed = true;
            }
            None => {
                out.push_str(&description[pos..=whole.start()]);
                pos = whole.start() + 1;
            }
        }
    }
    if !changed {
        return Cow::Borrowed(description);
    }
    out.push_str(&description[pos..]);
    Cow::Owned(out)
}

/// Return `fields` with its description's image markers rewritten.
pub fn rewrite(mut fields: IssueFields, cache: &ImageCache) -> IssueFields {
    if let Cow::Owned(updated) =
        rewrite_description(&fields.description, &fields.attachments, cache)
    {
        fields.description = updated;
    }
    fields
}
