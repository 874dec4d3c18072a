pub mod config;
pub mod model;
pub mod preprocess;

use shared::FreshnessLabel;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Image path does not exist: {0}")]
    InputMissing(PathBuf),
    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Model lock poisoned")]
    LockPoisoned,
    #[error("Predicted index {0} is outside the label set")]
    LabelOutOfRange(i64),
    #[error("Classifier config error: {0}")]
    Config(String),
    #[error("Classifier config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Maps an image on disk to one label of the fixed freshness label set.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image_path: &Path) -> Result<FreshnessLabel, ClassifierError>;
}
