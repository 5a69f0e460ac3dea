use clap::Parser;

/// gitreview: find git repositories that changed, open each one for review,
/// then print a journal entry of the new upstream content.
#[derive(Parser, Debug, Clone)]
#[command(name = "gitreview", version, about)]
pub struct Cli {
    /// Repository paths to review. When given, --roots is ignored
    pub paths: Vec<String>,

    /// Git GUI launched for each reviewed repository (default: smerge)
    #[arg(long)]
    pub gui: Option<String>,

    /// Environment variable naming, or path of, an existing file the journal
    /// entry is appended to. Falls back to stdout (default: SMARTY_REVIEW_LOG)
    #[arg(long)]
    pub outfile: Option<String>,

    /// When false, run every fetch with --dry-run (default: true)
    #[arg(long)]
    pub fetch: Option<bool>,

    /// Environment variable holding colon-separated directories to scan,
    /// non-recursively, for repositories (default: CDPATH)
    #[arg(long)]
    pub roots: Option<String>,

    /// Semicolon-separated files listing one repository per line
    #[arg(long)]
    pub roots_file: Option<String>,

    /// Letters of the categories to review: (a)head, (b)ehind, (e)rred,
    /// (f)etched, (j)ournal, (m)essy (default: abejm)
    #[arg(long)]
    pub review: Option<String>,

    /// Number of repositories probed concurrently (default: 16)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Substring a remote URL must contain for the repository to be
    /// journaled (default: smarty)
    #[arg(long)]
    pub org: Option<String>,

    /// Branch compared with origin when a repository sets no review.branch
    /// (default: master)
    #[arg(long)]
    pub default_branch: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<String>,

    /// Print the categorized repositories as JSON instead of reviewing them
    #[arg(long)]
    pub json: bool,
}
