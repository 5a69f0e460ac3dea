use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::commands::GitCommands;
use crate::process::{CommandExecutor, CommandOutput};

/// Marker `git fetch` prints in a ref update line, e.g.
/// `7761a97..1bbecb6  master -> origin/master`.
pub const FETCH_UPDATE_MARKER: &str = "..";

/// `git config --get` exits with 1 when the key is not set.
const CONFIG_KEY_MISSING: i32 = 1;

/// Outcome of a single probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    /// Notable output, absent when there was nothing worth reporting.
    pub output: Option<String>,
    /// Formatted failure, absent when the command succeeded.
    pub error: Option<String>,
}

impl ProbeResult {
    fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            error: None,
        }
    }
}

/// Everything learned about one repository in a single pass.
///
/// Built once by [`probe_repository`] and handed off by value; nothing
/// changes it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub repo_path: PathBuf,
    pub skip: ProbeResult,
    pub omit: ProbeResult,
    pub remote: ProbeResult,
    pub status: ProbeResult,
    /// The `review.branch` override, when one is set.
    pub branch: ProbeResult,
    pub fetch: ProbeResult,
    pub rev_list: ProbeResult,
    /// Branch compared with origin: the override, else the fallback.
    pub default_branch: String,
    pub ahead_count: usize,
    pub behind_count: usize,
    pub ahead_summary: Option<String>,
    pub behind_summary: Option<String>,
}

impl Report {
    fn skipped(repo_path: PathBuf, skip: ProbeResult) -> Self {
        Self {
            repo_path,
            skip,
            omit: ProbeResult::default(),
            remote: ProbeResult::default(),
            status: ProbeResult::default(),
            branch: ProbeResult::default(),
            fetch: ProbeResult::default(),
            rev_list: ProbeResult::default(),
            default_branch: String::new(),
            ahead_count: 0,
            behind_count: 0,
            ahead_summary: None,
            behind_summary: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skip.output.is_some()
    }

    pub fn is_omitted(&self) -> bool {
        self.omit.output.is_some()
    }

    /// Probe errors in probe order.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        [
            &self.skip,
            &self.omit,
            &self.remote,
            &self.status,
            &self.branch,
            &self.fetch,
            &self.rev_list,
        ]
        .into_iter()
        .filter_map(|p| p.error.as_deref())
    }

    /// One-line summary used for progress logging.
    pub fn progress(&self) -> String {
        if self.is_skipped() {
            return format!("{} [skipped]", self.repo_path.display());
        }
        let mut flags = Vec::new();
        if self.errors().next().is_some() {
            flags.push("erred".to_string());
        }
        if self.status.output.is_some() {
            flags.push("messy".to_string());
        }
        if self.fetch.output.is_some() {
            flags.push("fetched".to_string());
        }
        if self.ahead_count > 0 {
            flags.push(format!("ahead {}", self.ahead_count));
        }
        if self.behind_count > 0 {
            flags.push(format!("behind {}", self.behind_count));
        }
        if self.is_omitted() {
            flags.push("omitted".to_string());
        }
        if flags.is_empty() {
            format!("{}", self.repo_path.display())
        } else {
            format!("{} [{}]", self.repo_path.display(), flags.join(", "))
        }
    }
}

/// Tally of `git rev-list --left-right` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Divergence {
    pub ahead: usize,
    pub behind: usize,
    /// Behind lines, indented for display.
    pub behind_lines: Vec<String>,
}

/// `<` marks a commit only the local branch has, `>` one only the remote has.
pub fn parse_rev_list(text: &str) -> Divergence {
    let mut divergence = Divergence::default();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('<') {
            divergence.ahead += 1;
        } else if line.starts_with('>') {
            divergence.behind += 1;
            divergence.behind_lines.push(format!("  {line}"));
        }
    }
    divergence
}

/// Second field of the first non-empty `git remote -v` line.
pub fn parse_remote_url(text: &str) -> Option<&str> {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split_whitespace().nth(1))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

fn commits(n: usize) -> String {
    if n == 1 {
        "1 commit".to_string()
    } else {
        format!("{n} commits")
    }
}

pub fn format_probe_error(command: &str, error: &str) -> String {
    format!("[ERROR] Could not execute [{command}]: {error}")
}

/// Run every probe against one repository, in order.
///
/// A set `review.skip` stops the sequence right away. Any other failure is
/// recorded on its own probe and the sequence carries on.
pub async fn probe_repository<E: CommandExecutor>(
    executor: &E,
    commands: &GitCommands,
    repo_path: PathBuf,
) -> Report {
    let probe = Probe {
        executor,
        commands,
        dir: &repo_path,
    };

    let skip = probe.config_flag(&commands.skip).await;
    if skip.output.is_some() {
        return Report::skipped(repo_path, skip);
    }

    let omit = probe.config_flag(&commands.omit).await;
    let remote = probe.remote().await;
    let status = probe.status().await;
    let branch = probe.config_value(&commands.default_branch).await;
    let default_branch = branch
        .output
        .clone()
        .unwrap_or_else(|| commands.fallback_branch.clone());
    let fetch = probe.fetch().await;
    let (rev_list, divergence) = probe.rev_list(&default_branch).await;

    let ahead_summary = (divergence.ahead > 0).then(|| {
        format!(
            "{default_branch} is {} ahead of origin/{default_branch}.",
            commits(divergence.ahead)
        )
    });
    let behind_summary = (divergence.behind > 0).then(|| {
        format!(
            "{default_branch} is {} behind origin/{default_branch}:\n{}",
            commits(divergence.behind),
            divergence.behind_lines.join("\n")
        )
    });

    Report {
        repo_path,
        skip,
        omit,
        remote,
        status,
        branch,
        fetch,
        rev_list,
        default_branch,
        ahead_count: divergence.ahead,
        behind_count: divergence.behind,
        ahead_summary,
        behind_summary,
    }
}

struct Probe<'a, E> {
    executor: &'a E,
    commands: &'a GitCommands,
    dir: &'a Path,
}

impl<E: CommandExecutor> Probe<'_, E> {
    async fn run(&self, command: &str) -> CommandOutput {
        self.executor.execute(self.dir, command).await
    }

    fn failure(&self, command: &str, out: &CommandOutput) -> Option<String> {
        let error = out.error.as_deref()?;
        warn!(
            path = %self.dir.display(),
            command,
            error,
            "git command failed"
        );
        Some(format_probe_error(command, error))
    }

    async fn config_flag(&self, command: &str) -> ProbeResult {
        let mut result = self.config_value(command).await;
        if !result.output.as_deref().is_some_and(is_truthy) {
            result.output = None;
        }
        result
    }

    async fn remote(&self) -> ProbeResult {
        let command = &self.commands.remote;
        let out = self.run(command).await;
        match self.failure(command, &out) {
            Some(error) => ProbeResult {
                output: Some(self.dir.display().to_string()),
                error: Some(error),
            },
            None => ProbeResult {
                output: parse_remote_url(&out.text).map(str::to_string),
                error: None,
            },
        }
    }

    async fn status(&self) -> ProbeResult {
        let command = &self.commands.status;
        let out = self.run(command).await;
        if let Some(error) = self.failure(command, &out) {
            return ProbeResult {
                output: None,
                error: Some(error),
            };
        }
        if out.text.trim().is_empty() {
            ProbeResult::default()
        } else {
            ProbeResult::output(out.text)
        }
    }

    /// A config value, trimmed. An unset or blank key yields nothing; any
    /// other failure is recorded.
    async fn config_value(&self, command: &str) -> ProbeResult {
        let out = self.run(command).await;
        if out.exit_code == Some(CONFIG_KEY_MISSING) {
            return ProbeResult::default();
        }
        if let Some(error) = self.failure(command, &out) {
            return ProbeResult {
                output: None,
                error: Some(error),
            };
        }
        match out.text.trim() {
            "" => ProbeResult::default(),
            value => ProbeResult::output(value),
        }
    }

    async fn fetch(&self) -> ProbeResult {
        let command = &self.commands.fetch;
        let out = self.run(command).await;
        let error = self.failure(command, &out);
        let output = out
            .text
            .contains(FETCH_UPDATE_MARKER)
            .then(|| out.text.clone());
        ProbeResult { output, error }
    }

    async fn rev_list(&self, branch: &str) -> (ProbeResult, Divergence) {
        let command = self.commands.rev_list_for(branch);
        let out = self.run(&command).await;
        let error = self.failure(&command, &out);
        let divergence = parse_rev_list(&out.text);
        (
            ProbeResult {
                output: None,
                error,
            },
            divergence,
        )
    }
}
