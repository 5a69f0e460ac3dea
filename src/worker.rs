use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::commands::GitCommands;
use crate::probe::{Report, probe_repository};
use crate::process::CommandExecutor;

/// Work queue shared by every worker. Each path is received exactly once.
pub type PathQueue = Arc<Mutex<mpsc::Receiver<PathBuf>>>;

/// Pulls repository paths off the shared queue and probes them one at a time.
pub struct Worker<E> {
    id: usize,
    executor: Arc<E>,
    commands: Arc<GitCommands>,
    input: PathQueue,
    output: mpsc::Sender<Report>,
}

impl<E: CommandExecutor> Worker<E> {
    pub fn new(
        id: usize,
        executor: Arc<E>,
        commands: Arc<GitCommands>,
        input: PathQueue,
        output: mpsc::Sender<Report>,
    ) -> Self {
        Self {
            id,
            executor,
            commands,
            input,
            output,
        }
    }

    /// Run until the queue is closed and drained. Dropping `self` on return
    /// closes this worker's output.
    pub async fn run(self) {
        let mut processed = 0usize;
        loop {
            let next = self.input.lock().await.recv().await;
            let Some(path) = next else {
                break;
            };

            let path = std::path::absolute(&path).unwrap_or(path);
            let report = probe_repository(self.executor.as_ref(), &self.commands, path).await;
            info!(worker = self.id, "{}", report.progress());

            if self.output.send(report).await.is_err() {
                warn!(worker = self.id, "report receiver dropped, stopping worker");
                break;
            }
            processed += 1;
        }
        debug!(worker = self.id, processed, "worker finished");
    }
}
