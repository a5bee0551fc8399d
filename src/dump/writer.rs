//! Page writers for dump operations
//!
//! Each page becomes one self-contained file holding a JSON array of its
//! documents, in the order the service returned them, followed by a newline.
//! When the run requested all fields, the service's internal `_version_`
//! field is removed from every document first.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::WriteError;
use crate::source::{Document, Page};

/// Internal bookkeeping field of the search service
pub const RESERVED_FIELD: &str = "_version_";

/// Summary of one successfully written page file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub documents: usize,
    pub bytes: u64,
}

/// Trait for persisting one page to one file
#[async_trait]
pub trait PageSink: Send + Sync {
    /// Write `page` to `path`, creating or truncating the file
    ///
    /// # Returns
    /// * `Result<WrittenFile, WriteError>` - What was written, or an error scoped to this file
    async fn write_page(&self, page: Page, path: &Path) -> Result<WrittenFile, WriteError>;
}

/// Writer producing one JSON array file per page
#[derive(Debug, Clone, Copy)]
pub struct PageWriter {
    strip_reserved: bool,
}

impl PageWriter {
    /// Create a page writer
    ///
    /// # Arguments
    /// * `strip_reserved` - Remove [`RESERVED_FIELD`] from every document
    pub fn new(strip_reserved: bool) -> Self {
        Self { strip_reserved }
    }
}

/// Remove the reserved field, keeping the order of the remaining fields
pub fn strip_reserved_field(doc: &mut Document) {
    doc.shift_remove(RESERVED_FIELD);
}

/// Encode a page as a JSON array terminated by a newline
pub fn encode_page(page: Page, strip_reserved: bool) -> Result<Vec<u8>, serde_json::Error> {
    let mut data = Vec::new();

    if strip_reserved {
        data.push(b'[');
        for (n, mut doc) in page.into_documents().into_iter().enumerate() {
            if n > 0 {
                data.push(b',');
            }
            strip_reserved_field(&mut doc);
            serde_json::to_writer(&mut data, &doc)?;
        }
        data.extend_from_slice(b"]\n");
    } else {
        serde_json::to_writer(&mut data, page.documents())?;
        data.push(b'\n');
    }

    Ok(data)
}

/// Create (or truncate) the target file behind a buffer
async fn create_writer(path: &Path) -> Result<BufWriter<File>, WriteError> {
    let file = File::create(path).await.map_err(|source| WriteError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufWriter::with_capacity(1024 * 1024, file))
}

#[async_trait]
impl PageSink for PageWriter {
    async fn write_page(&self, page: Page, path: &Path) -> Result<WrittenFile, WriteError> {
        let documents = page.len();
        let mut writer = create_writer(path).await?;

        let data = encode_page(page, self.strip_reserved).map_err(|source| WriteError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

        let io_err = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        writer.write_all(&data).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;

        debug!("Wrote {} documents to {}", documents, path.display());

        Ok(WrittenFile {
            path: path.to_path_buf(),
            documents,
            bytes: data.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn sample_page() -> Page {
        Page::new(vec![
            doc(json!({ "id": "b", "_version_": 1700000000000000001u64, "title": "Two" })),
            doc(json!({ "id": "a", "tags": ["x", "y"], "nested": { "k": 1.5 } })),
        ])
    }

    #[test]
    fn test_encode_strips_reserved_field() {
        let data = encode_page(sample_page(), true).unwrap();
        let text = String::from_utf8(data).unwrap();
        assert_eq!(
            text,
            "[{\"id\":\"b\",\"title\":\"Two\"},{\"id\":\"a\",\"tags\":[\"x\",\"y\"],\"nested\":{\"k\":1.5}}]\n"
        );
    }

    #[test]
    fn test_encode_without_stripping_keeps_every_field() {
        let data = encode_page(sample_page(), false).unwrap();
        let decoded: Vec<Document> = serde_json::from_slice(&data).unwrap();
        assert_eq!(decoded, sample_page().into_documents());
        assert!(data.ends_with(b"]\n"));
    }

    #[test]
    fn test_encode_empty_page() {
        assert_eq!(encode_page(Page::default(), true).unwrap(), b"[]\n");
        assert_eq!(encode_page(Page::default(), false).unwrap(), b"[]\n");
    }

    #[test]
    fn test_strip_keeps_field_order() {
        let mut d = doc(json!({ "a": 1, "_version_": 2, "b": 3, "c": 4 }));
        strip_reserved_field(&mut d);
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        // absence is not an error
        strip_reserved_field(&mut d);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let first = encode_page(sample_page(), false).unwrap();
        let decoded: Vec<Document> = serde_json::from_slice(&first).unwrap();
        let second = encode_page(Page::new(decoded), false).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_write_page_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.c.1.json");

        let written = PageWriter::new(true)
            .write_page(sample_page(), &path)
            .await
            .unwrap();

        assert_eq!(written.documents, 2);
        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written.bytes, content.len() as u64);
        let decoded: Vec<Document> = serde_json::from_slice(&content).unwrap();
        assert!(decoded.iter().all(|d| !d.contains_key(RESERVED_FIELD)));
    }

    #[tokio::test]
    async fn test_write_page_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        tokio::fs::write(&path, vec![b'x'; 4096]).await.unwrap();

        PageWriter::new(false)
            .write_page(Page::default(), &path)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"[]\n");
    }

    #[tokio::test]
    async fn test_write_page_invalid_directory() {
        let result = PageWriter::new(true)
            .write_page(sample_page(), Path::new("/nonexistent/directory/p.json"))
            .await;
        assert!(matches!(result, Err(WriteError::Create { .. })));
    }
}
