use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Marker directory (or file, for worktrees) identifying a repository.
const GIT_MARKER: &str = ".git";

pub fn is_git_repository(path: &Path) -> bool {
    path.is_dir() && path.join(GIT_MARKER).exists()
}

/// Root directories from a colon-separated environment variable. Empty
/// entries and `.` are dropped.
pub fn roots_from_env(var: &str) -> Vec<PathBuf> {
    split_roots(&std::env::var(var).unwrap_or_default())
}

pub fn split_roots(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .map(str::trim)
        .filter(|root| !root.is_empty() && *root != ".")
        .map(PathBuf::from)
        .collect()
}

/// Repositories directly under each root. Scanning is not recursive, and a
/// root that cannot be read is skipped.
pub fn collect_repositories(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut repos = Vec::new();
    for root in roots {
        let listing = match std::fs::read_dir(root) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(root = %root.display(), "couldn't read root (skipping): {e}");
                continue;
            }
        };
        let mut found: Vec<PathBuf> = listing
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_git_repository(path))
            .collect();
        found.sort();
        repos.extend(found);
    }
    repos
}

/// Keep only the paths that are repositories.
pub fn filter_repositories(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            let keep = is_git_repository(path);
            if !keep {
                warn!(path = %path.display(), "not a git repository (skipping)");
            }
            keep
        })
        .cloned()
        .collect()
}

/// Expand `~/` and try relative paths against each root; the first one that
/// exists wins. Otherwise the path is returned as given.
pub fn resolve_path(path: &str, roots: &[PathBuf]) -> PathBuf {
    let path = path.trim();
    let expanded = match path.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    };

    if expanded.is_relative() {
        for root in roots {
            let candidate = root.join(&expanded);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    expanded
}

/// Read a file listing one repository per line. Blank lines and `#`
/// comments are ignored.
pub fn read_roots_file(path: &Path, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Discovery(format!(
            "roots file {} cannot be read: {e}",
            path.display()
        ))
    })?;

    let repos: Vec<PathBuf> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| resolve_path(line, roots))
        .collect();

    info!(
        file = %path.display(),
        "added {} repositories from roots file",
        repos.len()
    );
    Ok(repos)
}

/// Relative paths are joined onto the working directory so the same
/// repository never appears under two spellings.
fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Candidate repositories for a run.
///
/// Explicit paths and roots-file entries take precedence; the roots are only
/// scanned when neither produced anything.
pub fn discover(config: &Config) -> Result<Vec<PathBuf>> {
    let roots = roots_from_env(&config.roots);

    let mut explicit: Vec<PathBuf> = config.paths.iter().map(PathBuf::from).collect();
    if let Some(ref files) = config.roots_file {
        for file in files.split(';').filter(|f| !f.trim().is_empty()) {
            let file = resolve_path(file, &roots);
            explicit.extend(read_roots_file(&file, &roots)?);
        }
    }

    let repos = if explicit.is_empty() {
        info!(var = %config.roots, roots = roots.len(), "scanning root directories");
        collect_repositories(&roots)
    } else {
        filter_repositories(&explicit)
    };

    Ok(dedup(repos.into_iter().map(absolutize).collect()))
}
