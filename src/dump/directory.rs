//! Dump directory creation
//!
//! The directory is created once per run, before any page is written, and is
//! named `<pattern><yyyymmdd-hhmmss>`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tokio::fs;
use tracing::info;

use crate::error::DirectoryError;

use super::naming::{FileIndex, NamePattern};

/// Sortable creation timestamp used in directory names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// The directory that receives every page file of one run
#[derive(Debug, Clone)]
pub struct DumpDirectory {
    path: PathBuf,
    pattern: NamePattern,
}

impl DumpDirectory {
    /// Create the dump directory stamped with the current local time
    ///
    /// # Arguments
    /// * `root` - Destination root; missing parents are created
    /// * `pattern` - Name pattern of this run
    /// * `mode` - Unix permission bits (ignored on other platforms)
    ///
    /// # Returns
    /// * `Result<Self, DirectoryError>` - Created directory or error
    pub async fn create(
        root: &Path,
        pattern: &NamePattern,
        mode: u32,
    ) -> Result<Self, DirectoryError> {
        Self::create_at(root, pattern, mode, Local::now()).await
    }

    /// Create the dump directory stamped with `now`
    pub async fn create_at<Tz>(
        root: &Path,
        pattern: &NamePattern,
        mode: u32,
        now: DateTime<Tz>,
    ) -> Result<Self, DirectoryError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let path = root.join(pattern.dir_name(&timestamp));

        if let Ok(meta) = fs::metadata(&path).await {
            if !meta.is_dir() {
                return Err(DirectoryError::NotADirectory(path));
            }
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(&path)
            .await
            .map_err(|source| DirectoryError::CreationFailed {
                path: path.clone(),
                source,
            })?;

        info!("Dump directory: {}", path.display());

        Ok(Self {
            path,
            pattern: pattern.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full path of the file for page `index`
    pub fn file_path(&self, index: FileIndex) -> PathBuf {
        self.path.join(self.pattern.file_name(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pattern() -> NamePattern {
        NamePattern::from_link("http://localhost:8983/solr/books").unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[tokio::test]
    async fn test_create_directory_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = DumpDirectory::create_at(root.path(), &pattern(), 0o755, fixed_time())
            .await
            .unwrap();

        assert_eq!(
            dir.path(),
            root.path().join("localhost.8983.books.20240102-030405")
        );
        assert!(dir.path().is_dir());
        assert_eq!(
            dir.file_path(FileIndex::FIRST),
            dir.path().join("localhost.8983.books.1.json")
        );
    }

    #[tokio::test]
    async fn test_create_missing_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let dir = DumpDirectory::create_at(&nested, &pattern(), 0o755, fixed_time())
            .await
            .unwrap();
        assert!(dir.path().starts_with(&nested));
        assert!(dir.path().is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let dir = DumpDirectory::create_at(root.path(), &pattern(), 0o700, fixed_time())
            .await
            .unwrap();
        let mode = std::fs::metadata(dir.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn test_create_fails_on_file() {
        let root = tempfile::tempdir().unwrap();
        let clash = root.path().join("localhost.8983.books.20240102-030405");
        std::fs::write(&clash, b"not a dir").unwrap();

        let err = DumpDirectory::create_at(root.path(), &pattern(), 0o755, fixed_time())
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotADirectory(_)));
    }

    #[test]
    fn test_create_fails_under_file_root() {
        let root = tempfile::tempdir().unwrap();
        let file_root = root.path().join("plain-file");
        std::fs::write(&file_root, b"x").unwrap();

        let result = tokio_test::block_on(DumpDirectory::create_at(
            &file_root,
            &pattern(),
            0o755,
            fixed_time(),
        ));
        assert!(matches!(result, Err(DirectoryError::CreationFailed { .. })));
    }
}
