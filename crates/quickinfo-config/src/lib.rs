mod file;
mod memory;
mod resolver;
mod workspace;

pub use file::{default_global_dir, FileSettingsStore};
pub use memory::MemorySettingsStore;
pub use resolver::ConfigResolver;
pub use workspace::WorkspaceLayout;

use quickinfo_core::{Scope, Setting};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A folder or workspace scope was targeted but no workspace is open.
    #[error("no workspace is open for scope {0}")]
    NoWorkspace(String),

    #[error("config io error: {0}")]
    Io(String),

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Storage backend for scoped settings.
///
/// Implementations never interpret values; precedence is the resolver's job.
pub trait SettingsStore: Send + Sync {
    /// Read a setting from exactly one scope. `Ok(None)` if unset.
    fn read(&self, scope: Scope, setting: Setting) -> Result<Option<String>, ConfigError>;

    /// Write a setting into exactly one scope.
    /// Returns `ConfigError::NoWorkspace` for folder/workspace scopes when no workspace is open.
    fn write(&self, scope: Scope, setting: Setting, value: &str) -> Result<(), ConfigError>;

    /// Number of open workspace folders, in resolution order.
    fn folder_count(&self) -> usize;
}

/// Notification that a setting was written, mirroring the host's
/// configuration-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsChange {
    pub setting: Setting,
    /// Scope the value actually landed in, after any fallback.
    pub scope: Scope,
}

impl SettingsChange {
    pub fn affects(&self, setting: Setting) -> bool {
        self.setting == setting
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Box<T> {
    fn read(&self, scope: Scope, setting: Setting) -> Result<Option<String>, ConfigError> {
        (**self).read(scope, setting)
    }

    fn write(&self, scope: Scope, setting: Setting, value: &str) -> Result<(), ConfigError> {
        (**self).write(scope, setting, value)
    }

    fn folder_count(&self) -> usize {
        (**self).folder_count()
    }
}
