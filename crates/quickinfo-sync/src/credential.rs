use std::path::PathBuf;

use quickinfo_core::{QuickInfoError, Setting};
use tracing::debug;

/// Bearer token read from the file named by the `tokenPath` setting.
///
/// The token is read once and kept in memory until `invalidate` is called,
/// which the controller does whenever `tokenPath` changes.
#[derive(Debug, Default)]
pub struct CredentialLoader {
    cached: Option<String>,
}

impl CredentialLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    pub fn invalidate(&mut self) {
        if self.cached.take().is_some() {
            debug!("token cache invalidated");
        }
    }

    /// Return the cached token, reading `token_path` on first use.
    pub async fn token(&mut self, token_path: &str) -> Result<String, QuickInfoError> {
        if let Some(token) = &self.cached {
            return Ok(token.clone());
        }
        if token_path.trim().is_empty() {
            return Err(QuickInfoError::ConfigMissing(Setting::TokenPath));
        }

        let path = resolve_token_path(token_path);
        debug!("reading PAT from {}", path.display());
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            QuickInfoError::CredentialUnavailable(format!(
                "Can't read PAT at {}: {e}",
                path.display()
            ))
        })?;

        let token = content.trim().to_string();
        if token.is_empty() {
            return Err(QuickInfoError::CredentialUnavailable(format!(
                "PAT file {} is empty",
                path.display()
            )));
        }
        self.cached = Some(token.clone());
        Ok(token)
    }
}

/// Absolute form of a configured token path. `~/` expands to `$HOME`;
/// relative paths are taken from the working directory.
pub fn resolve_token_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let expanded = match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(raw),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}
