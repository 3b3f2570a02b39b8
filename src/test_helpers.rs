use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;

use crate::config::DEFAULT_BODY_LIMIT;
use crate::server::{AppState, build_router};
use crate::storage::{JsonFileStore, UploadStorage};

pub const BOUNDARY: &str = "imgcrop-test-boundary";

/// A router over a temp upload directory and metadata file.
pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
    pub metadata_file: PathBuf,
    _tmp: tempfile::TempDir,
}

pub async fn test_app() -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let upload_dir = tmp.path().join("uploads");
    let metadata_file = tmp.path().join("imageMetadata.json");
    let uploads = UploadStorage::new(upload_dir.clone());
    uploads.ensure_dir().await.unwrap();
    let state = AppState::new(uploads, Arc::new(JsonFileStore::new(metadata_file.clone())));
    TestApp {
        router: build_router(state, DEFAULT_BODY_LIMIT),
        upload_dir,
        metadata_file,
        _tmp: tmp,
    }
}

/// Encode `(field name, file name, content)` parts as a multipart body
/// delimited by [`BOUNDARY`].
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
