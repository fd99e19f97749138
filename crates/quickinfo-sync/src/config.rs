use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quickinfo_config::WorkspaceLayout;
use quickinfo_core::{Scope, Setting};

use crate::terminal::OutputMode;

#[derive(Debug, Parser)]
#[command(name = "quickinfo", about = "Show the current tracker issue as a one-line status")]
pub struct CliConfig {
    /// Workspace folder, in resolution order. Defaults to the current directory.
    #[arg(long = "workspace-folder", env = "QUICKINFO_WORKSPACE_FOLDERS", value_delimiter = ',')]
    pub workspace_folders: Vec<PathBuf>,

    /// Multi-root workspace file
    #[arg(long, env = "QUICKINFO_WORKSPACE_FILE")]
    pub workspace_file: Option<PathBuf>,

    /// Run without any workspace; only global settings apply
    #[arg(long, conflicts_with_all = ["workspace_folders", "workspace_file"])]
    pub no_workspace: bool,

    /// Directory holding the global settings.json
    #[arg(long, env = "QUICKINFO_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory for downloaded images
    #[arg(long, env = "QUICKINFO_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Empty the image cache before exiting
    #[arg(long)]
    pub ephemeral_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync the configured issue and print its label
    Status {
        /// Also print the tooltip markdown
        #[arg(long, conflicts_with = "json")]
        tooltip: bool,

        /// Print the full presentation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the current issue (prompts when KEY is omitted) and sync
    ChangeIssue { key: Option<String> },

    /// Set the tracker base URL (prompts when URL is omitted) and sync
    ChangeUrl { url: Option<String> },

    /// Open the current issue in the browser
    Open,

    /// Delete all cached images
    RemoveThumbnails,

    /// Read or write a single setting
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the resolved value
    Get {
        #[arg(value_parser = parse_setting)]
        setting: Setting,
    },

    /// Write a value into one scope
    Set {
        #[arg(value_parser = parse_setting)]
        setting: Setting,
        value: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::Workspace)]
        scope: ScopeArg,
    },

    /// Print every resolved setting
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// First workspace folder
    Folder,
    Workspace,
    Global,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Folder => Scope::Folder(0),
            ScopeArg::Workspace => Scope::Workspace,
            ScopeArg::Global => Scope::Global,
        }
    }
}

fn parse_setting(raw: &str) -> Result<Setting, String> {
    Setting::from_str(raw).ok_or_else(|| {
        let known: Vec<&str> = Setting::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown setting '{raw}' (expected one of {})", known.join(", "))
    })
}

impl CliConfig {
    pub fn layout(&self) -> Result<WorkspaceLayout> {
        if self.no_workspace {
            return Ok(WorkspaceLayout::empty());
        }
        if self.workspace_folders.is_empty() && self.workspace_file.is_none() {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            return Ok(WorkspaceLayout::single_folder(cwd));
        }
        Ok(WorkspaceLayout {
            folders: self.workspace_folders.clone(),
            workspace_file: self.workspace_file.clone(),
        })
    }

    pub fn output_mode(&self) -> OutputMode {
        match self.command {
            Command::Status { json: true, .. } => OutputMode::Json,
            Command::Status { tooltip: true, .. } => OutputMode::Tooltip,
            _ => OutputMode::Label,
        }
    }
}
