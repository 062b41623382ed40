use crate::backup::create_snapshot;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic snapshot tasks, one per tracked document
///
/// Each task only reads the document it tracks. The store replaces documents
/// atomically, so a snapshot is always a complete file.
pub struct BackupScheduler {
    root: PathBuf,
    interval: Duration,
    tasks: HashMap<PathBuf, JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl BackupScheduler {
    /// Creates a scheduler writing snapshots under `root` every `interval`
    pub fn new(root: impl Into<PathBuf>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            root: root.into(),
            interval,
            tasks: HashMap::new(),
            shutdown,
        }
    }

    pub fn is_tracking(&self, path: &Path) -> bool {
        self.tasks.contains_key(path)
    }

    pub fn tracked_count(&self) -> usize {
        self.tasks.len()
    }

    /// Starts backing up `path` unless it is already tracked
    ///
    /// The first snapshot is taken right away. Returns true if a new task was started.
    pub fn track(&mut self, path: &Path) -> bool {
        if self.tasks.contains_key(path) {
            return false;
        }

        let task = tokio::spawn(backup_loop(
            path.to_path_buf(),
            self.root.clone(),
            self.interval,
            self.shutdown.subscribe(),
        ));
        self.tasks.insert(path.to_path_buf(), task);
        tracing::info!(
            "Backup scheduler started for {} (every {}s)",
            path.display(),
            self.interval.as_secs()
        );
        true
    }

    /// Signals every task to stop and waits for them
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        for (path, task) in self.tasks.drain() {
            if let Err(e) = task.await {
                tracing::warn!("Backup task for {} ended abnormally: {}", path.display(), e);
            }
        }
    }
}

async fn backup_loop(
    path: PathBuf,
    root: PathBuf,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately
    ticker.tick().await;
    snapshot(&path, &root).await;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => snapshot(&path, &root).await,
        }
    }

    tracing::debug!("Backup task for {} stopped", path.display());
}

/// Copies `path` on the blocking pool so the walker keeps its worker
async fn snapshot(path: &Path, root: &Path) {
    let (source, target) = (path.to_path_buf(), root.to_path_buf());
    match tokio::task::spawn_blocking(move || create_snapshot(&source, &target)).await {
        Ok(Ok(copy)) => tracing::info!("Backup created: {}", copy.display()),
        Ok(Err(e)) => tracing::warn!("Backup of {} failed: {}", path.display(), e),
        Err(e) => tracing::warn!("Backup of {} did not complete: {}", path.display(), e),
    }
}
