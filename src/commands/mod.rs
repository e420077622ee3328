//! Command implementations for inhibitor.
//!
//! This module resolves the configuration shared by every command and routes
//! CLI commands to their implementations.

mod clear;
mod hold;
mod list;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Hold(args) => hold::cmd_hold(&config, args),
        Command::List(args) => list::cmd_list(&config, args),
        Command::Clear(args) => clear::cmd_clear(&config, args),
    }
}

/// Load the config file (if any) and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(run_dir) = &cli.run_dir {
        config.run_dir = run_dir.clone();
        config.validate()?;
    }

    tracing::debug!(base_dir = %config.base_dir().display(), "resolved configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InhibitError;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn resolve_config_defaults() {
        let cli = Cli::try_parse_from(["inhibitor", "list"]).unwrap();
        assert_eq!(resolve_config(&cli).unwrap(), Config::default());
    }

    #[test]
    fn run_dir_flag_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("inhibitor.yaml");
        std::fs::write(&path, "run_dir: /from/file\npoll_interval_ms: 42\n").unwrap();

        let cli = Cli::try_parse_from([
            "inhibitor",
            "list",
            "--config",
            path.to_str().unwrap(),
            "--run-dir",
            "/from/flag",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.run_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.poll_interval_ms, 42);
    }

    #[test]
    fn relative_run_dir_flag_is_rejected() {
        let cli = Cli::try_parse_from(["inhibitor", "list", "--run-dir", "relative"]).unwrap();
        assert!(matches!(resolve_config(&cli), Err(InhibitError::Config(_))));
    }
}
