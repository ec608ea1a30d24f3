//! Filesystem artifact store

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use docforge_core::ArtifactKind;
use thiserror::Error;
use tokio::fs;

pub type Result<T> = std::result::Result<T, ArtifactError>;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    PathTraversal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory name for generated images, swept alongside the kind directories.
pub(crate) const IMAGES_DIR: &str = "images";

/// Stores generated files on the local filesystem, one flat directory per
/// artifact kind under a common root.
///
/// File names are write-once and timestamp-derived, so concurrent handlers
/// never contend for the same path and no locking is needed.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding artifacts of the given kind.
    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Directory holding generated images.
    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    /// Every directory this store owns, in sweep order.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = ArtifactKind::ALL
            .iter()
            .map(|kind| self.kind_dir(*kind))
            .collect();
        dirs.push(self.images_dir());
        dirs
    }

    /// Create every kind directory (and missing parents). Idempotent.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in self.directories() {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Produce a fresh collision-resistant file name for a kind.
    ///
    /// The timestamp component is the UTC instant with every non-digit
    /// stripped, down to milliseconds. No collision check is performed;
    /// granularity plus the kind prefix makes clashes practically
    /// impossible.
    pub fn next_file_name(&self, kind: ArtifactKind) -> String {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        format!("{}-{}.{}", kind.file_prefix(), stamp, kind.extension())
    }

    /// Write artifact bytes. The parent directory is created on demand so a
    /// swept-away directory never fails a fresh generation.
    pub async fn write(&self, kind: ArtifactKind, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve(kind, file_name)?;
        fs::create_dir_all(self.kind_dir(kind)).await?;
        fs::write(&path, bytes).await?;
        tracing::debug!(file = %path.display(), size = bytes.len(), "artifact written");
        Ok(path)
    }

    pub async fn exists(&self, kind: ArtifactKind, file_name: &str) -> bool {
        match self.resolve(kind, file_name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Read an artifact back. Absence maps to `NotFound` so callers can
    /// answer 404 for swept files.
    pub async fn read(&self, kind: ArtifactKind, file_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(kind, file_name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(file_name.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Delete an artifact. A file that vanished between listing and deletion
    /// is expected (concurrent sweep), so missing files are a logged no-op.
    pub async fn delete(&self, kind: ArtifactKind, file_name: &str) -> Result<()> {
        let path = self.resolve(kind, file_name)?;
        Self::remove_file(&path).await
    }

    pub(crate) async fn remove_file(path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %path.display(), "delete skipped, file already gone");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// One-shot snapshot of a kind directory: (file name, modified time).
    pub async fn list(&self, kind: ArtifactKind) -> Result<Vec<(String, SystemTime)>> {
        Self::list_dir(&self.kind_dir(kind)).await
    }

    pub(crate) async fn list_dir(dir: &Path) -> Result<Vec<(String, SystemTime)>> {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let modified = entry.metadata().await?.modified()?;
            files.push((name, modified));
        }

        Ok(files)
    }

    /// Resolve a file name inside a kind directory, rejecting anything that
    /// would escape it. Artifact names are flat, so a single normal path
    /// component is the only accepted shape.
    pub fn resolve(&self, kind: ArtifactKind, file_name: &str) -> Result<PathBuf> {
        let dir = self.kind_dir(kind);
        Self::resolve_in(&dir, file_name)
    }

    /// Resolve an image file name inside the images directory.
    pub fn resolve_image(&self, file_name: &str) -> Result<PathBuf> {
        Self::resolve_in(&self.images_dir(), file_name)
    }

    /// Write image bytes under the images directory.
    pub async fn write_image(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve_image(file_name)?;
        fs::create_dir_all(self.images_dir()).await?;
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Read an image back; absence maps to `NotFound`.
    pub async fn read_image(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve_image(file_name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(file_name.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn resolve_in(dir: &Path, file_name: &str) -> Result<PathBuf> {
        let candidate = Path::new(file_name);
        let mut components = candidate.components();

        let is_plain = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();

        if !is_plain || file_name.contains('\\') {
            return Err(ArtifactError::PathTraversal(file_name.to_string()));
        }

        Ok(dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let (_dir, store) = store();
        store.ensure_directories().await.unwrap();

        let bytes = vec![0x50, 0x4b, 0x03, 0x04, 1, 2, 3];
        store
            .write(ArtifactKind::Spreadsheet, "excel-file-1.xlsx", &bytes)
            .await
            .unwrap();

        assert!(store.exists(ArtifactKind::Spreadsheet, "excel-file-1.xlsx").await);
        let read_back = store
            .read(ArtifactKind::Spreadsheet, "excel-file-1.xlsx")
            .await
            .unwrap();
        assert_eq!(read_back, bytes);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, store) = store();
        store.ensure_directories().await.unwrap();

        let result = store.read(ArtifactKind::Document, "word-file-0.docx").await;
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_an_error() {
        let (_dir, store) = store();
        store.ensure_directories().await.unwrap();

        store
            .delete(ArtifactKind::Presentation, "presentation-file-0.pptx")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_directories_is_idempotent() {
        let (_dir, store) = store();
        store.ensure_directories().await.unwrap();
        store.ensure_directories().await.unwrap();

        for kind in ArtifactKind::ALL {
            assert!(store.kind_dir(kind).is_dir());
        }
        assert!(store.images_dir().is_dir());
    }

    #[tokio::test]
    async fn test_list_snapshots_directory() {
        let (_dir, store) = store();
        store.ensure_directories().await.unwrap();

        store
            .write(ArtifactKind::Document, "word-file-a.docx", b"a")
            .await
            .unwrap();
        store
            .write(ArtifactKind::Document, "word-file-b.docx", b"b")
            .await
            .unwrap();

        let mut names: Vec<String> = store
            .list(ArtifactKind::Document)
            .await
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["word-file-a.docx", "word-file-b.docx"]);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let (_dir, store) = store();

        for name in ["../word-file-1.docx", "a/../../b.docx", "..", "sub/dir.docx"] {
            let result = store.resolve(ArtifactKind::Document, name);
            assert!(
                matches!(result, Err(ArtifactError::PathTraversal(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_next_file_name_shape() {
        let store = ArtifactStore::new(".");
        let name = store.next_file_name(ArtifactKind::Document);

        let rest = name.strip_prefix("word-file-").unwrap();
        let digits = rest.strip_suffix(".docx").unwrap();
        assert_eq!(digits.len(), 17);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_consecutive_names_differ() {
        let store = ArtifactStore::new(".");
        let first = store.next_file_name(ArtifactKind::Spreadsheet);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.next_file_name(ArtifactKind::Spreadsheet);
        assert_ne!(first, second);
    }
}
