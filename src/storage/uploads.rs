use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};

/// URL prefix (and relative path prefix) under which stored files are served.
pub const PUBLIC_MOUNT: &str = "uploads";

/// Directory holding uploaded image files.
///
/// Files are named `<millisecond-timestamp><extension>`. When two uploads
/// land on the same millisecond the later one is stored as
/// `<timestamp>-<n><extension>` instead of overwriting the first.
#[derive(Clone, Debug)]
pub struct UploadStorage {
    base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub file_name: String,
    /// Relative path recorded in the metadata store, e.g. `uploads/1700000000000.jpg`.
    pub image_path: String,
    pub path: PathBuf,
}

impl UploadStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the storage directory. Called once at startup; a directory
    /// removed afterwards makes every upload fail until it is recreated.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base_dir).await
    }

    pub async fn save(&self, original_name: &str, data: &[u8]) -> std::io::Result<StoredUpload> {
        self.save_at(Utc::now().timestamp_millis(), original_name, data)
            .await
    }

    pub async fn save_at(
        &self,
        timestamp_ms: i64,
        original_name: &str,
        data: &[u8],
    ) -> std::io::Result<StoredUpload> {
        let ext = extension_of(original_name);
        let mut attempt: u32 = 0;
        loop {
            let file_name = if attempt == 0 {
                format!("{timestamp_ms}{ext}")
            } else {
                format!("{timestamp_ms}-{attempt}{ext}")
            };
            let path = self.resolve_path(&file_name);
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;
                    return Ok(StoredUpload {
                        image_path: public_path(&file_name),
                        file_name,
                        path,
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn resolve_path(&self, file_name: &str) -> PathBuf {
        let normalized = file_name.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}

pub fn public_path(file_name: &str) -> String {
    format!("{PUBLIC_MOUNT}/{}", file_name.trim_start_matches('/'))
}

/// Extension of `file_name` including the leading dot, or `""`.
///
/// Only the first character of the final component is exempt from
/// starting an extension: `.hidden` and `..` have none, `..a` yields `.a`,
/// `file.` yields `.` and `archive.tar.gz` yields `.gz`.
pub fn extension_of(file_name: &str) -> &str {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    if base == ".." {
        return "";
    }
    let offset = usize::from(base.starts_with('.'));
    match base[offset..].rfind('.') {
        Some(index) => &base[offset + index..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage(dir: &Path) -> UploadStorage {
        let storage = UploadStorage::new(dir.join("uploads"));
        storage.ensure_dir().await.unwrap();
        storage
    }

    #[test]
    fn extension_matches_last_dot_of_final_component() {
        assert_eq!(extension_of("cropped-image.jpg"), ".jpg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("Photo.PNG"), ".PNG");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of(".hidden.jpg"), ".jpg");
        assert_eq!(extension_of("..a"), ".a");
        assert_eq!(extension_of("..."), ".");
        assert_eq!(extension_of(".."), "");
        assert_eq!(extension_of("."), "");
        assert_eq!(extension_of("file."), ".");
        assert_eq!(extension_of("dir/..a"), ".a");
        assert_eq!(extension_of("dir.d/noext"), "");
        assert_eq!(extension_of("C:\\pics\\cat.webp"), ".webp");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn public_path_is_under_mount() {
        assert_eq!(public_path("1.jpg"), "uploads/1.jpg");
        assert_eq!(public_path("/1.jpg"), "uploads/1.jpg");
    }

    #[tokio::test]
    async fn save_names_file_by_timestamp_and_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path()).await;

        let stored = storage
            .save_at(1_700_000_000_123, "cropped-image.jpg", b"jpeg bytes")
            .await
            .unwrap();
        assert_eq!(stored.file_name, "1700000000123.jpg");
        assert_eq!(stored.image_path, "uploads/1700000000123.jpg");
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn same_millisecond_uploads_are_disambiguated() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path()).await;

        let first = storage.save_at(42, "a.jpg", b"first").await.unwrap();
        let second = storage.save_at(42, "b.jpg", b"second").await.unwrap();
        let third = storage.save_at(42, "c.jpg", b"third").await.unwrap();

        assert_eq!(first.file_name, "42.jpg");
        assert_eq!(second.file_name, "42-1.jpg");
        assert_eq!(third.file_name, "42-2.jpg");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"second");
        assert_eq!(std::fs::read(&third.path).unwrap(), b"third");
    }

    #[tokio::test]
    async fn save_without_extension_uses_bare_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path()).await;

        let stored = storage.save_at(7, "blob", b"x").await.unwrap();
        assert_eq!(stored.file_name, "7");
    }

    #[tokio::test]
    async fn save_fails_when_directory_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(tmp.path().join("never-created"));

        let err = storage.save("a.jpg", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
