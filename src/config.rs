use std::path::Path;

use serde::Deserialize;

use crate::analyzer::DEFAULT_WORKERS;
use crate::categorize::{CategorizeSettings, DEFAULT_REVIEW_LETTERS, ReviewSelection};
use crate::cli::Cli;
use crate::commands::{DEFAULT_BRANCH, GitCommands};
use crate::error::{Error, Result};

pub const DEFAULT_GUI: &str = "smerge";
pub const DEFAULT_OUTFILE: &str = "SMARTY_REVIEW_LOG";
pub const DEFAULT_ROOTS_VAR: &str = "CDPATH";
pub const DEFAULT_ORG_MARKER: &str = "smarty";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub gui: Option<String>,
    pub outfile: Option<String>,
    pub fetch: Option<bool>,
    pub roots: Option<String>,
    pub roots_file: Option<String>,
    pub review: Option<String>,
    pub workers: Option<usize>,
    pub org: Option<String>,
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub paths: Vec<String>,
    pub gui: String,
    pub outfile: String,
    pub fetch: bool,
    /// Name of the environment variable listing root directories.
    pub roots: String,
    pub roots_file: Option<String>,
    pub review: ReviewSelection,
    pub workers: usize,
    pub org: String,
    pub default_branch: String,
    pub json: bool,
}

impl Config {
    /// Load the optional config file named by `--config` and merge the CLI
    /// over it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config {
            Some(ref path) => {
                let config_path = Path::new(path);
                if !config_path.exists() {
                    return Err(Error::ConfigNotFound(config_path.to_path_buf()));
                }
                let content = std::fs::read_to_string(config_path)?;
                parse_config(&content)?
            }
            None => ConfigFile::default(),
        };

        merge(file_config, cli)
    }

    pub fn commands(&self) -> GitCommands {
        GitCommands::new(self.fetch, self.default_branch.clone())
    }

    pub fn categorize_settings(&self) -> CategorizeSettings {
        CategorizeSettings {
            fetch_enabled: self.fetch,
            org_marker: self.org.clone(),
        }
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(workers) = config.workers
        && workers == 0
    {
        return Err(Error::ConfigValidation("workers must be > 0".to_string()));
    }
    if let Some(ref review) = config.review {
        ReviewSelection::from_letters(review)?;
    }
    if let Some(ref branch) = config.default_branch
        && branch.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "default_branch must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// CLI values win over file values, file values over defaults.
pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let workers = cli.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS);
    if workers == 0 {
        return Err(Error::ConfigValidation("workers must be > 0".to_string()));
    }

    let review_letters = cli
        .review
        .clone()
        .or(file.review)
        .unwrap_or_else(|| DEFAULT_REVIEW_LETTERS.to_string());

    Ok(Config {
        paths: cli.paths.clone(),
        gui: cli
            .gui
            .clone()
            .or(file.gui)
            .unwrap_or_else(|| DEFAULT_GUI.to_string()),
        outfile: cli
            .outfile
            .clone()
            .or(file.outfile)
            .unwrap_or_else(|| DEFAULT_OUTFILE.to_string()),
        fetch: cli.fetch.or(file.fetch).unwrap_or(true),
        roots: cli
            .roots
            .clone()
            .or(file.roots)
            .unwrap_or_else(|| DEFAULT_ROOTS_VAR.to_string()),
        roots_file: cli.roots_file.clone().or(file.roots_file),
        review: ReviewSelection::from_letters(&review_letters)?,
        workers,
        org: cli
            .org
            .clone()
            .or(file.org)
            .unwrap_or_else(|| DEFAULT_ORG_MARKER.to_string()),
        default_branch: cli
            .default_branch
            .clone()
            .or(file.default_branch)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        json: cli.json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
gui = "gitk"
outfile = "/tmp/review.md"
fetch = false
roots = "REPO_ROOTS"
review = "abf"
workers = 8
org = "acme"
default_branch = "main"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.gui.as_deref(), Some("gitk"));
        assert_eq!(config.fetch, Some(false));
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.default_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_zero_workers() {
        let err = parse_config("workers = 0").unwrap_err();
        assert!(err.to_string().contains("workers must be > 0"));
    }

    #[test]
    fn test_parse_invalid_review_letters() {
        let err = parse_config(r#"review = "axe""#).unwrap_err();
        assert!(err.to_string().contains("unknown review letter: x"));
    }

    #[test]
    fn test_parse_blank_default_branch() {
        let err = parse_config(r#"default_branch = " ""#).unwrap_err();
        assert!(err.to_string().contains("default_branch must not be empty"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = parse_config(r#"bogus = "value""#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let file = ConfigFile {
            gui: Some("gitk".to_string()),
            fetch: Some(false),
            workers: Some(8),
            org: Some("file-org".to_string()),
            ..Default::default()
        };
        let cli = Cli::parse_from(["gitreview", "--workers", "2", "--org", "cli-org"]);
        let config = merge(file, &cli).unwrap();
        assert_eq!(config.workers, 2); // CLI wins
        assert_eq!(config.org, "cli-org"); // CLI wins
        assert_eq!(config.gui, "gitk"); // file value kept
        assert!(!config.fetch); // file value kept
    }

    #[test]
    fn test_defaults_applied() {
        let cli = Cli::parse_from(["gitreview"]);
        let config = merge(ConfigFile::default(), &cli).unwrap();
        assert_eq!(config.gui, "smerge");
        assert_eq!(config.outfile, "SMARTY_REVIEW_LOG");
        assert!(config.fetch);
        assert_eq!(config.roots, "CDPATH");
        assert_eq!(config.roots_file, None);
        assert_eq!(config.review, ReviewSelection::default());
        assert_eq!(config.workers, 16);
        assert_eq!(config.org, "smarty");
        assert_eq!(config.default_branch, "master");
    }

    #[test]
    fn test_cli_zero_workers_rejected() {
        let cli = Cli::parse_from(["gitreview", "--workers", "0"]);
        let err = merge(ConfigFile::default(), &cli).unwrap_err();
        assert!(err.to_string().contains("workers must be > 0"));
    }

    #[test]
    fn test_commands_follow_fetch_flag() {
        let cli = Cli::parse_from(["gitreview", "--fetch", "false", "--default-branch", "main"]);
        let config = merge(ConfigFile::default(), &cli).unwrap();
        let commands = config.commands();
        assert_eq!(commands.fetch, "git fetch --dry-run");
        assert_eq!(commands.fallback_branch, "main");
        assert!(!config.categorize_settings().fetch_enabled);
    }

    #[test]
    fn test_load_missing_config_file() {
        let cli = Cli::parse_from(["gitreview", "--config", "/nonexistent/gitreview.toml"]);
        let err = Config::load(&cli).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitreview.toml");
        std::fs::write(&path, "workers = 3\nreview = \"m\"\n").unwrap();
        let cli = Cli::parse_from(["gitreview", "--config", path.to_str().unwrap()]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.workers, 3);
        assert!(config.review.messy);
        assert!(!config.review.ahead);
    }
}
