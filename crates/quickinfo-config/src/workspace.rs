use std::path::{Path, PathBuf};

/// The folders (and optional multi-root workspace file) open in the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub folders: Vec<PathBuf>,
    pub workspace_file: Option<PathBuf>,
}

impl WorkspaceLayout {
    /// A session with no workspace open (a single loose file, say).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single_folder(folder: impl Into<PathBuf>) -> Self {
        Self {
            folders: vec![folder.into()],
            workspace_file: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.folders.is_empty() || self.workspace_file.is_some()
    }

    /// Directory holding workspace-scoped settings: next to the workspace
    /// file for multi-root sessions, otherwise the first folder.
    pub fn root(&self) -> Option<&Path> {
        match &self.workspace_file {
            Some(file) => file.parent(),
            None => self.folders.first().map(PathBuf::as_path),
        }
    }

    /// Fallback issue key when none is configured: the name of the directory
    /// that contains the workspace file or the first workspace folder.
    /// Checkouts named after their issue (`.../PROJ-123/repo`) get the right key.
    pub fn default_issue_key(&self) -> Option<String> {
        let anchor = match &self.workspace_file {
            Some(file) => file.as_path(),
            None => self.folders.first()?.as_path(),
        };
        anchor
            .parent()?
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
    }
}
