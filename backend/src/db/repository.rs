use async_trait::async_trait;
use shared::{Device, Feedback, PredictionResult, UploadedImage};
use strum::Display;

use crate::auth::models::Admin;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("Repository lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Collection {
    Admins,
    Devices,
    Images,
    Results,
    Feedbacks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub per_page: usize,
}

impl Page {
    pub const DEFAULT_PER_PAGE: usize = 10;

    /// Pages are 1-based; anything below 1 is treated as the first page.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page,
        }
    }

    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Typed access to the collections the admin backend reads and writes.
#[async_trait]
pub trait FreshnessRepository: Send + Sync {
    async fn insert_image(&self, image: &UploadedImage) -> Result<(), RepositoryError>;
    async fn insert_result(&self, result: &PredictionResult) -> Result<(), RepositoryError>;
    async fn list_images(&self) -> Result<Vec<UploadedImage>, RepositoryError>;
    async fn list_results(&self) -> Result<Vec<PredictionResult>, RepositoryError>;
    async fn list_devices(&self, page: Page) -> Result<Vec<Device>, RepositoryError>;
    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, RepositoryError>;
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError>;
    async fn insert_admin(&self, admin: &Admin) -> Result<(), RepositoryError>;
    async fn count(&self, collection: Collection) -> Result<u64, RepositoryError>;
}
