use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::categorize::{Categories, Category};
use crate::error::{Error, Result};
use crate::sanitize::sanitize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    Append(PathBuf),
}

/// Resolve `--outfile`: blank means stdout; a set environment variable of
/// that name supplies the path; the path must already exist to be appended
/// to, otherwise the journal goes to stdout.
pub fn resolve_destination(outfile: &str) -> Destination {
    let outfile = outfile.trim();
    if outfile.is_empty() {
        return Destination::Stdout;
    }

    let path = match std::env::var(outfile) {
        Ok(value) if !value.trim().is_empty() => {
            info!("found output path in environment variable: {outfile}={value}");
            PathBuf::from(value.trim())
        }
        _ => PathBuf::from(outfile),
    };

    if path.is_file() {
        Destination::Append(path)
    } else {
        Destination::Stdout
    }
}

fn open_writer(destination: &Destination) -> Box<dyn Write> {
    match destination {
        Destination::Stdout => {
            info!("journal entry will be written to stdout");
            Box::new(std::io::stdout())
        }
        Destination::Append(path) => match OpenOptions::new().append(true).open(path) {
            Ok(file) => {
                info!("journal entry will be appended to {}", path.display());
                Box::new(file)
            }
            Err(e) => {
                warn!(
                    "could not open {} for appending ({e}), writing to stdout",
                    path.display()
                );
                Box::new(std::io::stdout())
            }
        },
    }
}

/// Dated heading followed by the sanitized fetch output of every journal
/// repository, in path order. `None` when nothing qualifies.
pub fn journal_entry(categories: &Categories, date: NaiveDate) -> Option<String> {
    let paths = categories.paths(Category::Journal);
    if paths.is_empty() {
        return None;
    }

    let mut entry = format!("## {}\n\n", date.format("%Y-%m-%d"));
    for path in paths {
        let Some(text) = categories.text(Category::Journal, path) else {
            continue;
        };
        entry.push_str(&sanitize(&text));
        entry.push('\n');
    }
    Some(entry)
}

pub fn write_journal(writer: &mut dyn Write, entry: &str) -> Result<()> {
    writer
        .write_all(entry.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| Error::Output(format!("failed to write journal entry: {e}")))
}

/// Write the journal entry for `date` to the destination named by `outfile`.
/// Returns whether anything was written.
pub fn emit_journal(categories: &Categories, outfile: &str, date: NaiveDate) -> Result<bool> {
    let Some(entry) = journal_entry(categories, date) else {
        info!("no repositories qualify for the journal");
        return Ok(false);
    };
    let mut writer = open_writer(&resolve_destination(outfile));
    write_journal(writer.as_mut(), &entry)?;
    Ok(true)
}

/// Category sets as pretty JSON, for `--json`.
pub fn categories_json(categories: &Categories) -> Result<String> {
    serde_json::to_string_pretty(categories)
        .map_err(|e| Error::Output(format!("failed to serialize categories: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_journal_entry_none_when_empty() {
        let mut categories = Categories::default();
        categories.add(Category::Fetched, Path::new("/src/a"), "a..b");
        assert!(journal_entry(&categories, date()).is_none());
    }

    #[test]
    fn test_journal_entry_heading_and_sanitized_text() {
        let mut categories = Categories::default();
        categories.add(
            Category::Journal,
            Path::new("/src/b"),
            "From github.com:smarty/b\nHost key fingerprint is SHA256:xyz\n   1..2  master -> origin/master\n",
        );
        categories.add(
            Category::Journal,
            Path::new("/src/a"),
            "From github.com:smarty/a\n   3..4  master -> origin/master\n",
        );

        let entry = journal_entry(&categories, date()).unwrap();
        assert_eq!(
            entry,
            "## 2024-03-09\n\n\
             From github.com:smarty/a\n   3..4  master -> origin/master\n\n\
             From github.com:smarty/b\n   1..2  master -> origin/master\n\n"
        );
    }

    #[test]
    fn test_write_journal_to_buffer() {
        let mut buf: Vec<u8> = Vec::new();
        write_journal(&mut buf, "## 2024-03-09\n\n").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "## 2024-03-09\n\n");
    }

    #[test]
    fn test_blank_outfile_is_stdout() {
        assert_eq!(resolve_destination("  "), Destination::Stdout);
    }

    #[test]
    fn test_existing_path_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("review.md");
        std::fs::write(&log, "# Reviews\n").unwrap();
        assert_eq!(
            resolve_destination(log.to_str().unwrap()),
            Destination::Append(log)
        );
    }

    #[test]
    fn test_missing_path_is_stdout() {
        assert_eq!(
            resolve_destination("/nonexistent/review.md"),
            Destination::Stdout
        );
    }

    #[test]
    fn test_categories_json() {
        let mut categories = Categories::default();
        categories.add(Category::Messy, Path::new("/src/a"), " M x\n");
        let json = categories_json(&categories).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["messy"]["/src/a"][0], " M x\n");
    }
}
