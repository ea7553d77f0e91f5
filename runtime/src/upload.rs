//! Uploaded files and where they end up on disk.

use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file part of a multipart form.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// File name sent by the client
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Public URL, `/<upload dir name>/<file name>`
    pub url: String,
    pub path: PathBuf,
    pub size: u64,
}

impl UploadedFile {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Write the file into `dir`.
    ///
    /// Unless `cover` is set an existing file is kept and the new one gets a `_<n>` suffix.
    pub async fn save(&self, dir: &Path, cover: bool) -> std::io::Result<SavedFile> {
        tokio::fs::create_dir_all(dir).await?;
        let name = sanitize(&self.file_name);
        let mut path = dir.join(&name);
        if !cover {
            let (stem, ext) = match name.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
                _ => (name.clone(), String::new()),
            };
            let mut n = 1;
            while tokio::fs::try_exists(&path).await? {
                path = dir.join(format!("{stem}_{n}{ext}"));
                n += 1;
            }
        }
        tokio::fs::write(&path, &self.bytes).await?;

        let stored = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name);
        let mount = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(path = %path.display(), size = self.size(), "upload saved");
        Ok(SavedFile {
            url: format!("/{mount}/{stored}"),
            path,
            size: self.size(),
        })
    }
}

/// Keep only the final path component and drop characters that are unsafe in file names.
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, body: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("photo.png"), "photo.png");
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\temp\\a?.txt"), "a.txt");
        assert_eq!(sanitize(".."), "upload");
        assert_eq!(sanitize(""), "upload");
    }

    #[tokio::test]
    async fn test_save_keeps_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("upload");

        let first = file("a.txt", b"one").save(&dir, false).await.unwrap();
        assert_eq!(first.url, "/upload/a.txt");
        assert_eq!(first.size, 3);

        let second = file("a.txt", b"two").save(&dir, false).await.unwrap();
        assert_eq!(second.url, "/upload/a_1.txt");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_save_with_cover_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("files");

        file("a.txt", b"one").save(&dir, true).await.unwrap();
        let saved = file("a.txt", b"three").save(&dir, true).await.unwrap();
        assert_eq!(saved.url, "/files/a.txt");
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"three");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }
}
