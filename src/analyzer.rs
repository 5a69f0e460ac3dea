use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::commands::GitCommands;
use crate::probe::Report;
use crate::process::CommandExecutor;
use crate::worker::{PathQueue, Worker};

pub const DEFAULT_WORKERS: usize = 16;

/// Hand-off capacity of every channel in the pipeline. Tokio channels need at
/// least one slot, so this is as close to an unbuffered hand-off as it gets.
const HANDOFF: usize = 1;

/// Fans repository paths out to a fixed pool of workers and merges their
/// reports back into one collection.
pub struct Analyzer<E> {
    worker_count: usize,
    executor: Arc<E>,
    commands: Arc<GitCommands>,
}

impl<E: CommandExecutor + 'static> Analyzer<E> {
    /// A `worker_count` of zero is treated as one.
    pub fn new(worker_count: usize, executor: E, commands: GitCommands) -> Self {
        Self {
            worker_count: worker_count.max(1),
            executor: Arc::new(executor),
            commands: Arc::new(commands),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Probe every path and return one report per path, in completion order.
    ///
    /// Returns only after every worker has drained the queue and every report
    /// has been forwarded.
    pub async fn analyze_all(&self, paths: Vec<PathBuf>) -> Vec<Report> {
        info!(
            repositories = paths.len(),
            workers = self.worker_count,
            "analyzing repositories"
        );
        let expected = paths.len();

        let (input_tx, input_rx) = mpsc::channel(HANDOFF);
        let queue: PathQueue = Arc::new(Mutex::new(input_rx));

        tokio::spawn(load_inputs(paths, input_tx));
        let outputs = self.start_workers(queue);

        let mut merged = merge(outputs);
        let mut reports = Vec::with_capacity(expected);
        while let Some(report) = merged.recv().await {
            reports.push(report);
        }

        if reports.len() != expected {
            warn!(
                expected,
                received = reports.len(),
                "report count does not match input count"
            );
        }
        reports
    }

    fn start_workers(&self, queue: PathQueue) -> Vec<mpsc::Receiver<Report>> {
        (0..self.worker_count)
            .map(|id| {
                let (tx, rx) = mpsc::channel(HANDOFF);
                let worker = Worker::new(
                    id,
                    Arc::clone(&self.executor),
                    Arc::clone(&self.commands),
                    Arc::clone(&queue),
                    tx,
                );
                tokio::spawn(worker.run());
                rx
            })
            .collect()
    }
}

/// Push every path in order, then close the queue by dropping the sender.
async fn load_inputs(paths: Vec<PathBuf>, tx: mpsc::Sender<PathBuf>) {
    for path in paths {
        if tx.send(path).await.is_err() {
            warn!("all workers exited before the queue was drained");
            return;
        }
    }
}

/// Fan the worker outputs into one channel. The merged channel closes only
/// after every forwarder has finished.
fn merge(outputs: Vec<mpsc::Receiver<Report>>) -> mpsc::Receiver<Report> {
    let (tx, rx) = mpsc::channel(HANDOFF);

    let mut forwarders = JoinSet::new();
    for mut output in outputs {
        let tx = tx.clone();
        forwarders.spawn(async move {
            while let Some(report) = output.recv().await {
                if tx.send(report).await.is_err() {
                    break;
                }
            }
        });
    }

    tokio::spawn(async move {
        while let Some(joined) = forwarders.join_next().await {
            if let Err(e) = joined {
                warn!("report forwarder failed: {e}");
            }
        }
        drop(tx);
    });

    rx
}
