//! Retention sweeper
//!
//! Deletes artifacts older than the retention window on a recurring
//! schedule aligned to the top of the hour, matching the write-side
//! guarantee that a just-written file is never eligible.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{Timelike, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::ArtifactStore;

/// Outcome of one sweep pass, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub retained: usize,
}

/// Handle to a running sweeper task.
///
/// Dropping the handle leaves the task running; call [`SweeperHandle::shutdown`]
/// to stop it, typically on process shutdown.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Recurring deletion of stale artifacts across every store directory.
pub struct RetentionSweeper {
    store: Arc<ArtifactStore>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<ArtifactStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Spawn the recurring sweep task. The first pass runs at the next top
    /// of the hour; each pass reschedules the next one.
    pub fn start(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let child = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let delay = delay_to_next_hour();
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                let report = self.sweep_once().await;
                tracing::info!(
                    deleted = report.deleted,
                    retained = report.retained,
                    "retention sweep finished"
                );
            }
        });

        SweeperHandle { cancel, task }
    }

    /// One full pass over every directory.
    ///
    /// Never fails: per-file and per-directory errors are logged and the
    /// pass moves on, so one bad kind cannot starve the others. Passes
    /// carry no state, and overlapping passes are harmless because
    /// deleting an already-deleted file is a no-op.
    pub async fn sweep_once(&self) -> SweepReport {
        let now = SystemTime::now();
        let mut report = SweepReport::default();

        for dir in self.store.directories() {
            match self.sweep_dir(&dir, now).await {
                Ok(partial) => {
                    report.deleted += partial.deleted;
                    report.retained += partial.retained;
                }
                Err(error) => {
                    tracing::warn!(dir = %dir.display(), %error, "sweep pass failed for directory");
                }
            }
        }

        report
    }

    async fn sweep_dir(
        &self,
        dir: &Path,
        now: SystemTime,
    ) -> Result<SweepReport, crate::ArtifactError> {
        let mut report = SweepReport::default();

        for (name, modified) in ArtifactStore::list_dir(dir).await? {
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.retention {
                report.retained += 1;
                continue;
            }

            let path = dir.join(&name);
            match ArtifactStore::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!(file = %path.display(), "deleted expired artifact");
                    report.deleted += 1;
                }
                Err(error) => {
                    tracing::warn!(file = %path.display(), %error, "failed to delete expired artifact");
                }
            }
        }

        Ok(report)
    }
}

/// Sleep duration to the next whole hour; a full hour when already on the
/// boundary so consecutive passes never collapse into one instant.
fn delay_to_next_hour() -> Duration {
    let now = Utc::now();
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    let remaining = 3600 - seconds_into_hour.min(3599);
    Duration::from_secs(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_core::ArtifactKind;
    use tempfile::TempDir;

    fn swept_store(retention: Duration) -> (TempDir, Arc<ArtifactStore>, RetentionSweeper) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path()));
        let sweeper = RetentionSweeper::new(store.clone(), retention);
        (dir, store, sweeper)
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_stale_files() {
        let (_dir, store, sweeper) = swept_store(Duration::from_secs(1));
        store.ensure_directories().await.unwrap();

        store
            .write(ArtifactKind::Spreadsheet, "excel-file-old.xlsx", b"old")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        store
            .write(ArtifactKind::Spreadsheet, "excel-file-new.xlsx", b"new")
            .await
            .unwrap();

        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted, 1);
        assert_eq!(report.retained, 1);

        assert!(!store.exists(ArtifactKind::Spreadsheet, "excel-file-old.xlsx").await);
        assert!(store.exists(ArtifactKind::Spreadsheet, "excel-file-new.xlsx").await);
    }

    #[tokio::test]
    async fn test_sweep_twice_is_idempotent() {
        let (_dir, store, sweeper) = swept_store(Duration::ZERO);
        store.ensure_directories().await.unwrap();

        store
            .write(ArtifactKind::Document, "word-file-stale.docx", b"stale")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = sweeper.sweep_once().await;
        assert_eq!(first.deleted, 1);

        let second = sweeper.sweep_once().await;
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_covers_every_kind_and_images() {
        let (_dir, store, sweeper) = swept_store(Duration::ZERO);
        store.ensure_directories().await.unwrap();

        for kind in ArtifactKind::ALL {
            let name = format!("{}-stale.{}", kind.file_prefix(), kind.extension());
            store.write(kind, &name, b"stale").await.unwrap();
        }
        store.write_image("stale.png", b"stale").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted, 4);
    }

    #[tokio::test]
    async fn test_sweep_with_missing_directories_is_quiet() {
        let (_dir, _store, sweeper) = swept_store(Duration::from_secs(3600));

        // Directories were never created; a pass still reports cleanly.
        let report = sweeper.sweep_once().await;
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_handle_shutdown_stops_the_task() {
        let (_dir, store, sweeper) = swept_store(Duration::from_secs(3600));
        store.ensure_directories().await.unwrap();

        let handle = sweeper.start();
        handle.shutdown().await;
    }

    #[test]
    fn test_delay_never_exceeds_an_hour() {
        let delay = delay_to_next_hour();
        assert!(delay <= Duration::from_secs(3600));
        assert!(delay >= Duration::from_secs(1));
    }
}
