#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gitreview::commands::GitCommands;
use gitreview::process::{CommandExecutor, CommandOutput};

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn configure_identity(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
}

/// A bare remote plus a clone tracking `master`, both with one commit.
/// Returns (bare remote, working clone, a second clone used to push upstream
/// changes).
pub fn setup_git_repo() -> (tempfile::TempDir, tempfile::TempDir, tempfile::TempDir) {
    let bare_dir = tempfile::TempDir::new().unwrap();
    run_git(bare_dir.path(), &["init", "--bare", "--initial-branch=master"]);

    let repo_dir = tempfile::TempDir::new().unwrap();
    run_git(repo_dir.path(), &["init", "--initial-branch=master"]);
    configure_identity(repo_dir.path());
    run_git(repo_dir.path(), &["commit", "--allow-empty", "-m", "init"]);
    run_git(
        repo_dir.path(),
        &["remote", "add", "origin", bare_dir.path().to_str().unwrap()],
    );
    run_git(repo_dir.path(), &["push", "-u", "origin", "master"]);

    let upstream_dir = tempfile::TempDir::new().unwrap();
    run_git(
        upstream_dir.path(),
        &[
            "clone",
            bare_dir.path().to_str().unwrap(),
            upstream_dir.path().to_str().unwrap(),
        ],
    );
    configure_identity(upstream_dir.path());

    (bare_dir, repo_dir, upstream_dir)
}

/// Executor that answers from a script instead of spawning processes.
///
/// Responses are keyed by command line and may be overridden per repository.
/// Unscripted commands succeed with empty output, except config reads, which
/// report the key as unset. Every call is recorded.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: HashMap<String, CommandOutput>,
    per_repo: HashMap<(PathBuf, String), CommandOutput>,
    max_delay: Option<Duration>,
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    pub fn respond_for(mut self, repo: &Path, command: &str, output: CommandOutput) -> Self {
        self.per_repo
            .insert((repo.to_path_buf(), command.to_string()), output);
        self
    }

    /// Sleep a random duration up to `max` before answering each call.
    pub fn with_random_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, repo: &Path) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(dir, _)| dir == repo)
            .map(|(_, command)| command)
            .collect()
    }

    fn answer(&self, dir: &Path, command_line: &str) -> CommandOutput {
        if let Some(out) = self
            .per_repo
            .get(&(dir.to_path_buf(), command_line.to_string()))
        {
            return out.clone();
        }
        if let Some(out) = self.responses.get(command_line) {
            return out.clone();
        }
        if command_line.starts_with("git config --get") {
            return config_unset();
        }
        CommandOutput::ok("")
    }
}

impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, dir: &Path, command_line: &str) -> CommandOutput {
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), command_line.to_string()));
        if let Some(max) = self.max_delay {
            let millis = rand::random::<u64>() % (max.as_millis() as u64 + 1);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        self.answer(dir, command_line)
    }
}

/// Lets a test keep a handle on a [`ScriptedExecutor`] the analyzer owns.
pub struct SharedExecutor(pub Arc<ScriptedExecutor>);

impl CommandExecutor for SharedExecutor {
    async fn execute(&self, dir: &Path, command_line: &str) -> CommandOutput {
        self.0.execute(dir, command_line).await
    }
}

/// What `git config --get` returns for a key that is not set.
pub fn config_unset() -> CommandOutput {
    CommandOutput::failed("", Some(1), "exit status 1")
}

pub fn default_commands() -> GitCommands {
    GitCommands::new(true, "master")
}

pub const REMOTE_SMARTY: &str = "origin\tgit@github.com:smarty/widgets.git (fetch)\n\
                                 origin\tgit@github.com:smarty/widgets.git (push)\n";
pub const REMOTE_OTHER: &str = "origin\tgit@github.com:someone/else.git (fetch)\n";
pub const FETCH_UPDATED: &str = "From github.com:smarty/widgets\n   7761a97..1bbecb6  master     -> origin/master\n";
pub const REV_LIST: &str = "git rev-list --left-right master...origin/master";
