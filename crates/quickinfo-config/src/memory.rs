use std::collections::HashMap;
use std::sync::Mutex;

use quickinfo_core::{Scope, Setting};

use crate::{ConfigError, SettingsStore};

/// In-process settings backend. Useful for embedders that own their own
/// persistence, and for tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    folders: usize,
    values: Mutex<HashMap<(Scope, Setting), String>>,
}

impl MemorySettingsStore {
    /// A store for a session with `folders` open workspace folders.
    /// Zero folders means no workspace is open.
    pub fn new(folders: usize) -> Self {
        Self {
            folders,
            values: Mutex::new(HashMap::new()),
        }
    }

    fn check_scope(&self, scope: Scope) -> Result<(), ConfigError> {
        match scope {
            Scope::Global => Ok(()),
            Scope::Workspace if self.folders > 0 => Ok(()),
            Scope::Folder(i) if i < self.folders => Ok(()),
            other => Err(ConfigError::NoWorkspace(other.display_name())),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read(&self, scope: Scope, setting: Setting) -> Result<Option<String>, ConfigError> {
        let values = self
            .values
            .lock()
            .map_err(|e| ConfigError::Io(format!("lock poisoned: {e}")))?;
        Ok(values.get(&(scope, setting)).cloned())
    }

    fn write(&self, scope: Scope, setting: Setting, value: &str) -> Result<(), ConfigError> {
        self.check_scope(scope)?;
        let mut values = self
            .values
            .lock()
            .map_err(|e| ConfigError::Io(format!("lock poisoned: {e}")))?;
        values.insert((scope, setting), value.to_string());
        Ok(())
    }

    fn folder_count(&self) -> usize {
        self.folders
    }
}
