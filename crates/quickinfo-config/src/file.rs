use std::io::Write;
use std::path::{Path, PathBuf};

use quickinfo_core::{Scope, Setting};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{ConfigError, SettingsStore, WorkspaceLayout};

const SETTINGS_DIR: &str = ".quickinfo";
const FOLDER_FILE: &str = "settings.json";
const WORKSPACE_FILE: &str = "workspace.json";
const GLOBAL_FILE: &str = "settings.json";

/// JSON-file settings backend.
///
/// - folder scope: `<folder>/.quickinfo/settings.json`
/// - workspace scope: `<workspace root>/.quickinfo/workspace.json`
/// - global scope: `<global dir>/settings.json`
pub struct FileSettingsStore {
    layout: WorkspaceLayout,
    global_dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(layout: WorkspaceLayout, global_dir: Option<PathBuf>) -> Self {
        Self {
            layout,
            global_dir: global_dir.unwrap_or_else(default_global_dir),
        }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    fn path_for(&self, scope: Scope) -> Result<PathBuf, ConfigError> {
        match scope {
            Scope::Folder(i) => self
                .layout
                .folders
                .get(i)
                .map(|f| f.join(SETTINGS_DIR).join(FOLDER_FILE))
                .ok_or_else(|| ConfigError::NoWorkspace(scope.display_name())),
            Scope::Workspace => self
                .layout
                .root()
                .map(|r| r.join(SETTINGS_DIR).join(WORKSPACE_FILE))
                .ok_or_else(|| ConfigError::NoWorkspace(scope.display_name())),
            Scope::Global => Ok(self.global_dir.join(GLOBAL_FILE)),
        }
    }
}

/// Global settings directory: `QUICKINFO_CONFIG_DIR`, else
/// `$XDG_CONFIG_HOME/quickinfo`, else `$HOME/.config/quickinfo`.
pub fn default_global_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUICKINFO_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".")
    };
    base.join("quickinfo")
}

/// Read a settings file. Returns an empty map if the file doesn't exist.
fn read_map(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("read {}: {e}", path.display())))?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    let val: Value = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
    match val {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::Parse(format!(
            "{}: expected a JSON object",
            path.display()
        ))),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .ok_or_else(|| ConfigError::Io(format!("no parent dir for {}", path.display())))?;
    std::fs::create_dir_all(parent)
        .map_err(|e| ConfigError::Io(format!("mkdir {}: {e}", parent.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| ConfigError::Io(format!("tempfile: {e}")))?;
    tmp.write_all(data)
        .and_then(|_| tmp.flush())
        .map_err(|e| ConfigError::Io(format!("write {}: {e}", path.display())))?;
    tmp.persist(path)
        .map_err(|e| ConfigError::Io(format!("persist {}: {e}", path.display())))?;
    Ok(())
}

impl SettingsStore for FileSettingsStore {
    fn read(&self, scope: Scope, setting: Setting) -> Result<Option<String>, ConfigError> {
        let path = match self.path_for(scope) {
            Ok(p) => p,
            Err(ConfigError::NoWorkspace(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let map = read_map(&path)?;
        Ok(match map.get(setting.as_str()) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    fn write(&self, scope: Scope, setting: Setting, value: &str) -> Result<(), ConfigError> {
        let path = self.path_for(scope)?;
        let mut map = read_map(&path)?;
        map.insert(
            setting.as_str().to_string(),
            Value::String(value.to_string()),
        );
        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| ConfigError::Parse(format!("encode settings: {e}")))?;
        write_atomic(&path, json.as_bytes())?;
        debug!("wrote {} to {}", setting, path.display());
        Ok(())
    }

    fn folder_count(&self) -> usize {
        self.layout.folders.len()
    }
}
