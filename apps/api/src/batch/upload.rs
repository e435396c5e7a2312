use std::io::{self, Write};
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, warn};

/// One uploaded resume: the caller's file name plus a temporary copy on local disk.
///
/// The artifact is owned by this value. `release` consumes it, so it can be removed
/// at most once; dropping without releasing still removes it, silently.
#[derive(Debug)]
pub struct UploadedFile {
    file_name: String,
    path: TempPath,
}

impl UploadedFile {
    /// Writes `bytes` to a new temp file in `dir`, keeping the original extension so
    /// extraction can dispatch on it.
    pub fn persist(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<Self> {
        let suffix = Path::new(file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!("Stored upload '{file_name}' ({} bytes)", bytes.len());
        Ok(Self {
            file_name: file_name.to_string(),
            path: file.into_temp_path(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the artifact. Failures are logged, never propagated.
    pub fn release(self) {
        let Self { file_name, path } = self;
        if let Err(e) = path.close() {
            warn!("Failed to remove temp artifact for '{file_name}': {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_keeps_extension_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::persist(dir.path(), "Jane Doe.PDF", b"%PDF-1.4").unwrap();

        assert_eq!(file.file_name(), "Jane Doe.PDF");
        assert_eq!(file.path().extension().unwrap(), "PDF");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_release_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::persist(dir.path(), "cv.docx", b"bytes").unwrap();
        let path = file.path().to_path_buf();

        file.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_name_without_extension_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::persist(dir.path(), "resume", b"x").unwrap();
        assert!(file.path().extension().is_none());
        file.release();
    }
}
