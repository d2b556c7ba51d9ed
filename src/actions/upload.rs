use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionElement, ActionRecord, ActionType, ActionValue, FileUpload};
use crate::dom::{FileSource, SelectedFile};
use crate::errors::{RecorderError, Result};
use crate::page::{DomEvent, EventKind, Page};
use crate::utils::accessibility::input_type;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use tracing::{debug, warn};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Reads the bytes behind a picked file.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, file: &SelectedFile) -> Result<Vec<u8>>;
}

/// In-memory files are returned as-is; on-disk files go through `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileReader;

#[async_trait]
impl FileReader for TokioFileReader {
    async fn read(&self, file: &SelectedFile) -> Result<Vec<u8>> {
        match &file.source {
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| RecorderError::FileRead {
                        name: file.name.clone(),
                        source,
                    })
            }
        }
    }
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// A file-input change whose reads have not finished yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub element: ActionElement,
    pub files: Vec<SelectedFile>,
    pub timestamp: i64,
}

impl PendingUpload {
    /// Reads every file in parallel. Files that fail to read are dropped;
    /// `None` when nothing could be read.
    pub async fn resolve(self, reader: &dyn FileReader) -> Option<ActionRecord> {
        let reads = join_all(self.files.iter().map(|file| reader.read(file))).await;

        let mut values = Vec::new();
        for (file, read) in self.files.iter().zip(reads) {
            match read {
                Ok(bytes) => values.push(ActionValue {
                    file_upload: Some(FileUpload {
                        name: file.name.clone(),
                        mime_type: file.mime_type.clone(),
                        size: bytes.len() as u64,
                        last_modified: file.last_modified,
                        data_url: data_url(&file.mime_type, &bytes),
                    }),
                    ..ActionValue::at(self.timestamp)
                }),
                Err(err) => warn!(file = %file.name, "dropping file from upload: {}", err),
            }
        }

        let mut values = values.into_iter();
        let first = values.next()?;
        let mut record = ActionRecord::new(ActionType::Upload, first).with_element(self.element);
        for value in values {
            record.push_data(value);
        }
        Some(record)
    }
}

#[derive(Debug, Default)]
pub struct UploadHandler;

impl EventHandler for UploadHandler {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Change]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        let doc = &page.document;
        if doc.tag_name(event.target) != Some("input") || input_type(doc, event.target) != "file" {
            return None;
        }
        if !event.is_trusted {
            debug!("untrusted file change ignored");
            return None;
        }
        let files = doc.files(event.target).to_vec();
        if files.is_empty() {
            return None;
        }
        Some(Captured::Upload(PendingUpload {
            element: ctx.element(page, event.target, ctx.config.selector.change_min_score),
            files,
            timestamp: ctx.now_ms,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pending(files: Vec<SelectedFile>) -> PendingUpload {
        PendingUpload {
            element: ActionElement::new(vec!["#file".to_string()]),
            files,
            timestamp: 42,
        }
    }

    #[test]
    fn encodes_data_urls() {
        assert_eq!(data_url("text/plain", b"hi"), "data:text/plain;base64,aGk=");
        assert_eq!(data_url("", b""), "data:application/octet-stream;base64,");
    }

    #[tokio::test]
    async fn one_entry_per_readable_file() {
        let upload = pending(vec![
            SelectedFile::from_bytes("a.txt", "text/plain", b"abc".to_vec()),
            SelectedFile::from_path("gone.png", "image/png", PathBuf::from("/nonexistent/gone.png")),
            SelectedFile::from_bytes("b.txt", "text/plain", b"de".to_vec()),
        ]);
        let record = upload.resolve(&TokioFileReader).await.unwrap();
        assert_eq!(record.action_type, ActionType::Upload);
        let names: Vec<_> = record
            .action_datas
            .iter()
            .filter_map(|data| data.value.file_upload.as_ref())
            .map(|file| file.name.as_str())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(record.primary_selector(), Some("#file"));
    }

    #[tokio::test]
    async fn nothing_readable_means_no_record() {
        let upload = pending(vec![SelectedFile::from_path(
            "gone.png",
            "image/png",
            PathBuf::from("/nonexistent/gone.png"),
        )]);
        assert!(upload.resolve(&TokioFileReader).await.is_none());
    }
}
