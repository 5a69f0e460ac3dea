use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::probe::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Erred,
    Messy,
    Ahead,
    Behind,
    Fetched,
    Journal,
    Omitted,
    Skipped,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Erred,
        Category::Messy,
        Category::Ahead,
        Category::Behind,
        Category::Fetched,
        Category::Journal,
        Category::Omitted,
        Category::Skipped,
    ];

    /// Letter selecting this category in `--review`. Omitted and skipped
    /// repositories are never reviewed on their own account.
    pub fn letter(self) -> Option<char> {
        match self {
            Category::Ahead => Some('a'),
            Category::Behind => Some('b'),
            Category::Erred => Some('e'),
            Category::Fetched => Some('f'),
            Category::Journal => Some('j'),
            Category::Messy => Some('m'),
            Category::Omitted | Category::Skipped => None,
        }
    }

    /// Log line preamble for the review summary.
    pub fn description(self) -> &'static str {
        match self {
            Category::Erred => "experienced errors",
            Category::Messy => "have uncommitted changes",
            Category::Ahead => "are ahead of their origin",
            Category::Behind => "are behind their origin",
            Category::Fetched => "have new fetched content",
            Category::Journal => "have new content for the review journal",
            Category::Omitted => "are omitted from the review journal",
            Category::Skipped => "were skipped",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Erred => write!(f, "erred"),
            Category::Messy => write!(f, "messy"),
            Category::Ahead => write!(f, "ahead"),
            Category::Behind => write!(f, "behind"),
            Category::Fetched => write!(f, "fetched"),
            Category::Journal => write!(f, "journal"),
            Category::Omitted => write!(f, "omitted"),
            Category::Skipped => write!(f, "skipped"),
        }
    }
}

/// Which categories drive the interactive review, from `--review` letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSelection {
    pub ahead: bool,
    pub behind: bool,
    pub erred: bool,
    pub fetched: bool,
    pub journal: bool,
    pub messy: bool,
}

pub const DEFAULT_REVIEW_LETTERS: &str = "abejm";

impl Default for ReviewSelection {
    fn default() -> Self {
        Self {
            ahead: true,
            behind: true,
            erred: true,
            fetched: false,
            journal: true,
            messy: true,
        }
    }
}

impl ReviewSelection {
    /// Parse letters such as `abejm`, case-insensitively.
    pub fn from_letters(letters: &str) -> Result<Self> {
        let mut selection = Self {
            ahead: false,
            behind: false,
            erred: false,
            fetched: false,
            journal: false,
            messy: false,
        };
        for c in letters.chars().map(|c| c.to_ascii_lowercase()) {
            match c {
                'a' => selection.ahead = true,
                'b' => selection.behind = true,
                'e' => selection.erred = true,
                'f' => selection.fetched = true,
                'j' => selection.journal = true,
                'm' => selection.messy = true,
                other => {
                    return Err(Error::ConfigValidation(format!(
                        "unknown review letter: {other} (expected any of: abefjm)"
                    )));
                }
            }
        }
        Ok(selection)
    }

    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Ahead => self.ahead,
            Category::Behind => self.behind,
            Category::Erred => self.erred,
            Category::Fetched => self.fetched,
            Category::Journal => self.journal,
            Category::Messy => self.messy,
            Category::Omitted | Category::Skipped => false,
        }
    }
}

/// Path to every signal recorded for it, in the order they were recorded.
pub type CategorySet = BTreeMap<PathBuf, Vec<String>>;

/// Repositories grouped by review category. A path may belong to any number
/// of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Categories {
    sets: BTreeMap<Category, CategorySet>,
}

impl Categories {
    /// Append a signal; earlier signals for the same path are kept.
    pub fn add(&mut self, category: Category, path: &Path, signal: impl Into<String>) {
        self.sets
            .entry(category)
            .or_default()
            .entry(path.to_path_buf())
            .or_default()
            .push(signal.into());
    }

    pub fn contains(&self, category: Category, path: &Path) -> bool {
        self.sets
            .get(&category)
            .is_some_and(|set| set.contains_key(path))
    }

    pub fn len(&self, category: Category) -> usize {
        self.sets.get(&category).map_or(0, |set| set.len())
    }

    pub fn paths(&self, category: Category) -> Vec<&Path> {
        self.sets
            .get(&category)
            .map(|set| set.keys().map(PathBuf::as_path).collect())
            .unwrap_or_default()
    }

    pub fn signals(&self, category: Category, path: &Path) -> &[String] {
        self.sets
            .get(&category)
            .and_then(|set| set.get(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All signals for a path in one category, concatenated.
    pub fn text(&self, category: Category, path: &Path) -> Option<String> {
        let signals = self.signals(category, path);
        if signals.is_empty() {
            return None;
        }
        Some(
            signals
                .iter()
                .map(|s| s.trim_end())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Sorted, deduplicated union of the paths in every selected category.
    pub fn reviewable(&self, selection: &ReviewSelection) -> Vec<PathBuf> {
        let unique: BTreeSet<&PathBuf> = self
            .sets
            .iter()
            .filter(|(category, _)| selection.includes(**category))
            .flat_map(|(_, set)| set.keys())
            .collect();
        unique.into_iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizeSettings {
    pub fetch_enabled: bool,
    /// Substring a remote URL must contain for its repository to be journaled.
    pub org_marker: String,
}

/// Place every report's repository into the categories its fields call for.
pub fn categorize(reports: &[Report], settings: &CategorizeSettings) -> Categories {
    let marker = settings.org_marker.to_lowercase();
    let mut categories = Categories::default();

    for report in reports {
        let path = report.repo_path.as_path();

        for error in report.errors() {
            categories.add(Category::Erred, path, error);
        }
        if let Some(ref skip) = report.skip.output {
            categories.add(Category::Skipped, path, skip);
        }
        if let Some(ref omit) = report.omit.output {
            categories.add(Category::Omitted, path, omit);
        }
        if let Some(ref status) = report.status.output {
            categories.add(Category::Messy, path, status);
        }
        if let Some(ref summary) = report.ahead_summary
            && report.ahead_count > 0
        {
            categories.add(Category::Ahead, path, summary);
        }
        if let Some(ref summary) = report.behind_summary
            && report.behind_count > 0
        {
            categories.add(Category::Behind, path, summary);
        }

        let Some(ref fetched) = report.fetch.output else {
            continue;
        };
        if !settings.fetch_enabled {
            continue;
        }
        categories.add(Category::Fetched, path, fetched);

        let org_remote = report
            .remote
            .output
            .as_deref()
            .is_some_and(|url| url.to_lowercase().contains(&marker));
        if org_remote && !report.is_omitted() {
            categories.add(Category::Journal, path, fetched);
        }
    }

    categories
}
