// Local filesystem adapter - File system operations for exports

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// Local filesystem adapter
pub struct FsLocalAdapter {
    output_dir: PathBuf,
}

impl FsLocalAdapter {
    /// Create new filesystem adapter writing generated outputs to `output_dir`
    pub fn new(output_dir: PathBuf) -> Result<Self, DomainError> {
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            DomainError::SessionCreationFailed(format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_exists(&self, file_path: &Path) -> Result<bool, DomainError> {
        match tokio::fs::metadata(file_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::ProcessingFailed(format!(
                "Failed to stat {}: {}",
                file_path.display(),
                e
            ))),
        }
    }

    async fn delete_file(&self, file_path: &Path) -> Result<(), DomainError> {
        match tokio::fs::remove_file(file_path).await {
            Ok(()) => {
                debug!("Deleted {}", file_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::ProcessingFailed(format!(
                "Failed to delete {}: {}",
                file_path.display(),
                e
            ))),
        }
    }

    async fn create_temp_output(&self, prefix: &str, suffix: &str) -> Result<PathBuf, DomainError> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.output_dir)
            .map_err(|e| {
                DomainError::SessionCreationFailed(format!(
                    "Failed to create output file in {}: {}",
                    self.output_dir.display(),
                    e
                ))
            })?;
        file.into_temp_path().keep().map_err(|e| {
            DomainError::SessionCreationFailed(format!("Failed to keep output file: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_output_naming() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsLocalAdapter::new(dir.path().to_path_buf()).unwrap();

        let path = fs.create_temp_output("processed_", ".mp4").await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("processed_"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(fs.file_exists(&path).await.unwrap());

        let other = fs.create_temp_output("processed_", ".mp4").await.unwrap();
        assert_ne!(path, other);
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsLocalAdapter::new(dir.path().to_path_buf()).unwrap();
        let path = dir.path().join("gone.mp4");

        fs.delete_file(&path).await.unwrap();

        std::fs::write(&path, b"partial").unwrap();
        fs.delete_file(&path).await.unwrap();
        assert!(!fs.file_exists(&path).await.unwrap());
    }
}
