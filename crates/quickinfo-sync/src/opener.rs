use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

/// Platform command used to hand a URL to the default browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOpenCommand {
    pub program: PathBuf,
    pub prefix_args: Vec<OsString>,
}

impl UrlOpenCommand {
    pub fn for_os(target_os: &str) -> Result<Self> {
        match target_os {
            "macos" => Ok(Self {
                program: PathBuf::from("open"),
                prefix_args: Vec::new(),
            }),
            "linux" | "freebsd" | "openbsd" | "netbsd" => Ok(Self {
                program: PathBuf::from("xdg-open"),
                prefix_args: Vec::new(),
            }),
            "windows" => Ok(Self {
                program: PathBuf::from("cmd"),
                prefix_args: vec![
                    OsString::from("/C"),
                    OsString::from("start"),
                    OsString::from(""),
                ],
            }),
            _ => Err(anyhow!(
                "opening URLs is unsupported on `{target_os}`"
            )),
        }
    }

    pub fn args_for(&self, url: &str) -> Vec<OsString> {
        let mut args = self.prefix_args.clone();
        args.push(OsString::from(url));
        args
    }
}

/// Open `url` in the system browser and wait for the launcher to exit.
pub async fn open_url(url: &str) -> Result<()> {
    let command = UrlOpenCommand::for_os(std::env::consts::OS)?;
    debug!("opening {url} with {}", command.program.display());
    let status = tokio::process::Command::new(&command.program)
        .args(command.args_for(url))
        .status()
        .await
        .with_context(|| format!("failed to launch {}", command.program.display()))?;
    if !status.success() {
        bail!("{} exited with {status}", command.program.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_per_platform() {
        let mac = UrlOpenCommand::for_os("macos").unwrap();
        assert_eq!(mac.program, PathBuf::from("open"));
        assert!(mac.prefix_args.is_empty());

        let linux = UrlOpenCommand::for_os("linux").unwrap();
        assert_eq!(linux.program, PathBuf::from("xdg-open"));

        let windows = UrlOpenCommand::for_os("windows").unwrap();
        assert_eq!(windows.program, PathBuf::from("cmd"));
        assert_eq!(
            windows.args_for("https://jira/browse/K-1"),
            vec![
                OsString::from("/C"),
                OsString::from("start"),
                OsString::from(""),
                OsString::from("https://jira/browse/K-1"),
            ]
        );
    }

    #[test]
    fn unsupported_platform_is_an_error() {
        let err = UrlOpenCommand::for_os("plan9").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
