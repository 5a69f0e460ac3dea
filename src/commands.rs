/// Git command lines run against each repository.
///
/// Probes never build command text themselves; everything comes from this
/// value, so a test can swap in its own templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommands {
    pub skip: String,
    pub omit: String,
    pub remote: String,
    pub status: String,
    pub default_branch: String,
    pub fetch: String,
    /// `{branch}` is replaced with the resolved default branch.
    pub rev_list: String,
    /// Branch compared against `origin/<branch>` when the repository has no
    /// `review.branch` override.
    pub fallback_branch: String,
}

pub const DEFAULT_BRANCH: &str = "master";
const DRY_RUN_FLAG: &str = "--dry-run";

impl Default for GitCommands {
    fn default() -> Self {
        Self {
            skip: "git config --get review.skip".to_string(),
            omit: "git config --get review.omit".to_string(),
            remote: "git remote -v".to_string(),
            status: "git status --porcelain -uall".to_string(),
            default_branch: "git config --get review.branch".to_string(),
            fetch: "git fetch".to_string(),
            rev_list: "git rev-list --left-right {branch}...origin/{branch}".to_string(),
            fallback_branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

impl GitCommands {
    /// Templates for a run. With `fetch` disabled, fetches pass `--dry-run`.
    pub fn new(fetch: bool, fallback_branch: impl Into<String>) -> Self {
        let mut commands = Self {
            fallback_branch: fallback_branch.into(),
            ..Self::default()
        };
        if !fetch {
            commands.fetch = format!("{} {DRY_RUN_FLAG}", commands.fetch);
        }
        commands
    }

    pub fn rev_list_for(&self, branch: &str) -> String {
        self.rev_list.replace("{branch}", branch)
    }
}
