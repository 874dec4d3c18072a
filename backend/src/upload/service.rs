use chrono::Utc;
use shared::{PredictedClass, PredictionResult, UploadResponse, UploadedImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::classifier::ImageClassifier;
use crate::db::repository::{FreshnessRepository, RepositoryError};
use crate::storage::image_store::{ImageStore, StorageError};

/// Recorded for every successful classification until the model reports a real confidence.
pub const PLACEHOLDER_QUALITY_SCORE: f64 = 0.95;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub predicted_class: PredictedClass,
    pub quality_score: f64,
    pub error_flag: bool,
}

impl Classification {
    fn failed() -> Self {
        Self {
            predicted_class: PredictedClass::Error,
            quality_score: 0.0,
            error_flag: true,
        }
    }
}

/// Turns one uploaded file into a stored image plus its prediction record.
pub struct UploadService {
    classifier: Arc<dyn ImageClassifier>,
    repository: Arc<dyn FreshnessRepository>,
    store: ImageStore,
}

impl UploadService {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        repository: Arc<dyn FreshnessRepository>,
        store: ImageStore,
    ) -> Self {
        Self {
            classifier,
            repository,
            store,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub async fn handle_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        device_id: &str,
    ) -> Result<UploadResponse, UploadError> {
        let image_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        let staged = self.store.stage(&image_id, file_name, bytes).await?;
        let classification = self.classify_staged(staged.clone()).await;
        let final_path = self
            .store
            .promote(&staged, &classification.predicted_class)
            .await?;

        let image = UploadedImage {
            image_id: image_id.clone(),
            device_id: device_id.to_string(),
            timestamp,
            storage_path: final_path.to_string_lossy().into_owned(),
        };
        let result = PredictionResult {
            result_id: Uuid::new_v4().to_string(),
            image_id,
            predicted_class: classification.predicted_class,
            quality_score: Some(classification.quality_score),
            error_flag: classification.error_flag,
        };

        self.repository.insert_image(&image).await?;
        self.repository.insert_result(&result).await?;

        log::info!(
            "Recorded upload {} from device {} as {}",
            image.image_id,
            image.device_id,
            result.predicted_class
        );
        Ok(UploadResponse { image, result })
    }

    /// Classifier failures, including a panic on the worker thread, become an error record.
    async fn classify_staged(&self, staged: PathBuf) -> Classification {
        let classifier = self.classifier.clone();
        let outcome =
            tokio::task::spawn_blocking(move || classifier.classify(Path::new(&staged))).await;

        match outcome {
            Ok(Ok(label)) => Classification {
                predicted_class: PredictedClass::Label(label),
                quality_score: PLACEHOLDER_QUALITY_SCORE,
                error_flag: false,
            },
            Ok(Err(e)) => {
                log::warn!("Classification failed: {}", e);
                Classification::failed()
            }
            Err(e) => {
                log::warn!("Classifier worker did not complete: {}", e);
                Classification::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::db::memory_repository::MemoryRepository;
    use crate::db::repository::Collection;
    use shared::FreshnessLabel;
    use tempfile::{TempDir, tempdir};

    struct FixedClassifier(FreshnessLabel);

    impl ImageClassifier for FixedClassifier {
        fn classify(&self, image_path: &Path) -> Result<FreshnessLabel, ClassifierError> {
            assert!(image_path.exists(), "classifier must see the staged file");
            Ok(self.0)
        }
    }

    struct DecodeOnlyClassifier;

    impl ImageClassifier for DecodeOnlyClassifier {
        fn classify(&self, image_path: &Path) -> Result<FreshnessLabel, ClassifierError> {
            crate::classifier::preprocess::load_image(image_path)?;
            Ok(FreshnessLabel::FreshCarrot)
        }
    }

    struct PanickingClassifier;

    impl ImageClassifier for PanickingClassifier {
        fn classify(&self, _image_path: &Path) -> Result<FreshnessLabel, ClassifierError> {
            panic!("device lost");
        }
    }

    fn service_with(
        classifier: Arc<dyn ImageClassifier>,
    ) -> (UploadService, Arc<MemoryRepository>, TempDir) {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryRepository::new());
        let store = ImageStore::new(dir.path().join("uploads"), dir.path().join("images"), 1 << 20);
        let service = UploadService::new(classifier, repo.clone(), store);
        (service, repo, dir)
    }

    #[tokio::test]
    async fn successful_upload_writes_linked_records() {
        let (service, repo, dir) =
            service_with(Arc::new(FixedClassifier(FreshnessLabel::FreshBanana)));

        let response = service
            .handle_upload("banana.jpg", b"jpeg bytes", "scale-01")
            .await
            .unwrap();

        assert_eq!(response.result.image_id, response.image.image_id);
        assert_eq!(
            response.result.predicted_class,
            PredictedClass::Label(FreshnessLabel::FreshBanana)
        );
        assert_eq!(response.result.quality_score, Some(PLACEHOLDER_QUALITY_SCORE));
        assert!(!response.result.error_flag);
        assert_eq!(response.image.device_id, "scale-01");

        let expected_path = dir
            .path()
            .join("images")
            .join("FreshBanana")
            .join(format!("{}_banana.jpg", response.image.image_id));
        assert_eq!(PathBuf::from(&response.image.storage_path), expected_path);
        assert!(expected_path.exists());

        assert_eq!(repo.list_images().await.unwrap(), vec![response.image.clone()]);
        assert_eq!(repo.list_results().await.unwrap(), vec![response.result.clone()]);
    }

    #[tokio::test]
    async fn corrupted_image_is_recorded_as_error() {
        let (service, repo, dir) = service_with(Arc::new(DecodeOnlyClassifier));

        let response = service
            .handle_upload("broken.png", b"not an image", "scale-02")
            .await
            .unwrap();

        assert_eq!(response.result.predicted_class, PredictedClass::Error);
        assert_eq!(response.result.quality_score, Some(0.0));
        assert!(response.result.error_flag);
        assert!(
            PathBuf::from(&response.image.storage_path)
                .starts_with(dir.path().join("images").join("Error"))
        );
        assert_eq!(repo.count(Collection::Images).await.unwrap(), 1);
        assert_eq!(repo.count(Collection::Results).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_file_is_stored_and_recorded_as_error() {
        let (service, repo, _dir) = service_with(Arc::new(DecodeOnlyClassifier));

        let response = service.handle_upload("empty.jpg", b"", "scale-04").await.unwrap();

        assert_eq!(response.result.predicted_class, PredictedClass::Error);
        assert!(response.result.error_flag);
        assert!(PathBuf::from(&response.image.storage_path).exists());
        assert_eq!(repo.count(Collection::Results).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn classifier_panic_does_not_escape() {
        let (service, repo, _dir) = service_with(Arc::new(PanickingClassifier));

        let response = service
            .handle_upload("apple.png", b"bytes", "scale-03")
            .await
            .unwrap();

        assert!(response.result.error_flag);
        assert_eq!(repo.count(Collection::Results).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn each_upload_gets_fresh_identifiers() {
        let (service, repo, _dir) =
            service_with(Arc::new(FixedClassifier(FreshnessLabel::RottenTomato)));

        let first = service.handle_upload("t.png", b"1", "d").await.unwrap();
        let second = service.handle_upload("t.png", b"2", "d").await.unwrap();

        assert_ne!(first.image.image_id, second.image.image_id);
        assert_ne!(first.result.result_id, second.result.result_id);
        assert_ne!(first.image.storage_path, second.image.storage_path);
        assert_eq!(repo.count(Collection::Images).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn oversized_upload_writes_nothing() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryRepository::new());
        let store = ImageStore::new(dir.path().join("uploads"), dir.path().join("images"), 2);
        let service = UploadService::new(
            Arc::new(FixedClassifier(FreshnessLabel::FreshApple)),
            repo.clone(),
            store,
        );

        let err = service.handle_upload("a.png", b"123", "d").await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Storage(StorageError::FileTooLarge { .. })
        ));
        assert_eq!(repo.count(Collection::Images).await.unwrap(), 0);
        assert_eq!(repo.count(Collection::Results).await.unwrap(), 0);
    }
}
