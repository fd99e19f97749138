use quickinfo_core::{Scope, Setting, TrackerConfig};
use tracing::{debug, warn};

use crate::{ConfigError, SettingsChange, SettingsStore};

/// Resolves settings through the folder → workspace → global cascade.
pub struct ConfigResolver<S> {
    store: S,
}

impl<S: SettingsStore> ConfigResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// First non-empty value wins: each folder in order, then the workspace,
    /// then the global scope. Unset everywhere resolves to `""`.
    ///
    /// Unreadable scopes are logged and skipped; resolution itself never fails.
    pub fn resolve(&self, setting: Setting) -> String {
        let folders = (0..self.store.folder_count()).map(Scope::Folder);
        let cascade = folders.chain([Scope::Workspace, Scope::Global]);

        for scope in cascade {
            match self.store.read(scope, setting) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!("{setting} resolved from {} scope", scope.display_name());
                    return value;
                }
                Ok(_) => {}
                Err(e) => warn!("skipping {} scope for {setting}: {e}", scope.display_name()),
            }
        }
        String::new()
    }

    pub fn resolve_config(&self) -> TrackerConfig {
        TrackerConfig {
            base_url: self.resolve(Setting::Url),
            issue_key: self.resolve(Setting::Issue),
            token_path: self.resolve(Setting::TokenPath),
        }
    }

    /// Write `value` into `scope`. If that scope does not exist in this
    /// session (no workspace open), the value goes to the global scope instead
    /// so the input is not lost. The returned change names the scope actually written.
    pub fn set(
        &self,
        setting: Setting,
        value: &str,
        scope: Scope,
    ) -> Result<SettingsChange, ConfigError> {
        match self.store.write(scope, setting, value) {
            Ok(()) => Ok(SettingsChange { setting, scope }),
            Err(ConfigError::NoWorkspace(target)) => {
                warn!("no workspace open for {target}; writing {setting} to global settings");
                self.store.write(Scope::Global, setting, value)?;
                Ok(SettingsChange {
                    setting,
                    scope: Scope::Global,
                })
            }
            Err(e) => Err(e),
        }
    }
}
