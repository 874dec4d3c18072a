use shared::PredictedClass;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Clone)]
pub struct ImageStore {
    staging_dir: PathBuf,
    images_dir: PathBuf,
    max_upload_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: usize, max: usize },
    #[error("Staged file has no file name: {0}")]
    InvalidStagedPath(PathBuf),
}

impl ImageStore {
    pub fn new(staging_dir: PathBuf, images_dir: PathBuf, max_upload_bytes: usize) -> Self {
        Self {
            staging_dir,
            images_dir,
            max_upload_bytes,
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.staging_dir).await?;
        fs::create_dir_all(&self.images_dir).await?;
        Ok(())
    }

    pub fn validate_size(&self, size: usize) -> Result<(), StorageError> {
        if size > self.max_upload_bytes {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// `<image_id>_<name>`, where only the final component of the client's file name is kept.
    pub fn staged_file_name(image_id: &str, original_name: &str) -> String {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("upload");
        format!("{}_{}", image_id, base)
    }

    pub async fn stage(
        &self,
        image_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        self.validate_size(bytes.len())?;
        fs::create_dir_all(&self.staging_dir).await?;
        let path = self
            .staging_dir
            .join(Self::staged_file_name(image_id, original_name));
        fs::write(&path, bytes).await?;
        log::debug!("Staged {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Moves a staged file into the directory of its predicted class.
    pub async fn promote(
        &self,
        staged: &Path,
        class: &PredictedClass,
    ) -> Result<PathBuf, StorageError> {
        let file_name = staged
            .file_name()
            .ok_or_else(|| StorageError::InvalidStagedPath(staged.to_path_buf()))?;
        let class_dir = self.images_dir.join(class.to_string());
        fs::create_dir_all(&class_dir).await?;
        let final_path = class_dir.join(file_name);
        fs::rename(staged, &final_path).await?;
        log::debug!("Moved {} to {}", staged.display(), final_path.display());
        Ok(final_path)
    }
}
