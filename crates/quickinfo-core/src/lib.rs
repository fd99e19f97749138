pub mod error;
pub mod issue;
pub mod presentation;
pub mod setting;

pub use error::QuickInfoError;
pub use issue::{Attachment, CommentPage, IssueFields, IssueKey, IssueResponse, IssueStatus, User};
pub use presentation::{browse_url, ClickAction, RenderedPresentation, Tooltip};
pub use setting::{Scope, Setting, TrackerConfig};
