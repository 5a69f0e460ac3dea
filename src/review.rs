use std::io::BufRead;
use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::categorize::{Categories, Category, ReviewSelection};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Continue,
    Skip,
    Quit,
}

impl Answer {
    /// `q` quits, `s` skips, anything else (including end of input)
    /// continues.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "q" | "quit" => Answer::Quit,
            "s" | "skip" => Answer::Skip,
            _ => Answer::Continue,
        }
    }
}

/// Where the review pass talks to the user.
pub trait ReviewConsole {
    fn show(&mut self, text: &str);
    fn prompt(&mut self, message: &str) -> Result<Answer>;
}

/// Console on stderr and stdin, keeping stdout free for the journal.
pub struct StdinConsole;

impl ReviewConsole for StdinConsole {
    fn show(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn prompt(&mut self, message: &str) -> Result<Answer> {
        eprintln!("{message}");
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::Review(format!("failed to read from stdin: {e}")))?;
        Ok(Answer::parse(&line))
    }
}

pub trait GuiLauncher {
    fn launch(&self, path: &Path) -> Result<()>;
}

/// Runs `<program> <path>` and waits for it.
pub struct CommandLauncher {
    program: String,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl GuiLauncher for CommandLauncher {
    fn launch(&self, path: &Path) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(path)
            .status()
            .map_err(|e| Error::Review(format!("failed to launch '{}': {e}", self.program)))?;
        if !status.success() {
            return Err(Error::Review(format!(
                "'{}' exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

/// Drives the interactive pass over the reviewable repositories.
pub struct Reviewer<C, G> {
    console: C,
    launcher: G,
    selection: ReviewSelection,
}

impl<C: ReviewConsole, G: GuiLauncher> Reviewer<C, G> {
    pub fn new(console: C, launcher: G, selection: ReviewSelection) -> Self {
        Self {
            console,
            launcher,
            selection,
        }
    }

    /// Log how many repositories landed in each category.
    pub fn summarize(&self, categories: &Categories) {
        for category in Category::ALL {
            let paths = categories.paths(category);
            if paths.is_empty() {
                continue;
            }
            info!(
                "the following {} repositories {}:",
                paths.len(),
                category.description()
            );
            for path in paths {
                info!("  {}", path.display());
            }
        }
    }

    /// Show each reviewable repository and open it in the GUI. Returns how
    /// many were opened. Quitting at a prompt yields [`Error::Interrupted`].
    pub fn review_all(&mut self, categories: &Categories) -> Result<usize> {
        let paths = categories.reviewable(&self.selection);
        if paths.is_empty() {
            info!("nothing to review today");
            return Ok(0);
        }

        self.summarize(categories);
        info!("a total of {} repositories need to be reviewed", paths.len());

        let start = self.console.prompt(&format!(
            "Press <ENTER> to initiate review (will open up to {} review windows), 'q' to quit...",
            paths.len()
        ))?;
        if start == Answer::Quit {
            return Err(Error::Interrupted);
        }

        let total = paths.len();
        let mut opened = 0;
        for (i, path) in paths.iter().enumerate() {
            self.console
                .show(&format!("[{}/{total}] {}", i + 1, path.display()));
            for category in Category::ALL {
                if !self.selection.includes(category) {
                    continue;
                }
                if let Some(text) = categories.text(category, path) {
                    self.console.show(&format!("{category}:\n{text}"));
                }
            }

            match self
                .console
                .prompt("Press <ENTER> to open the git GUI, 's' to skip, 'q' to quit...")?
            {
                Answer::Quit => return Err(Error::Interrupted),
                Answer::Skip => continue,
                Answer::Continue => {}
            }

            match self.launcher.launch(path) {
                Ok(()) => opened += 1,
                Err(e) => warn!(path = %path.display(), "failed to open git GUI: {e}"),
            }
        }
        Ok(opened)
    }

    /// Final confirmation before the journal entry is written.
    pub fn conclude(&mut self) -> Result<()> {
        match self
            .console
            .prompt("Press <ENTER> to conclude review and print the journal entry, 'q' to quit...")?
        {
            Answer::Quit => Err(Error::Interrupted),
            _ => Ok(()),
        }
    }
}
