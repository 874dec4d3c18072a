use async_trait::async_trait;
use shared::{Device, Feedback, PredictionResult, UploadedImage};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::repository::{Collection, FreshnessRepository, Page, RepositoryError};
use crate::auth::models::Admin;

#[derive(Default)]
struct Collections {
    admins: Vec<Admin>,
    devices: Vec<Device>,
    images: Vec<UploadedImage>,
    results: Vec<PredictionResult>,
    feedbacks: Vec<Feedback>,
}

/// Process-local repository keeping every collection in insertion order.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<Collections>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, RepositoryError> {
        self.collections.read().map_err(|_| RepositoryError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, RepositoryError> {
        self.collections.write().map_err(|_| RepositoryError::LockPoisoned)
    }
}

#[cfg(test)]
impl MemoryRepository {
    pub fn insert_device(&self, device: Device) {
        self.collections.write().unwrap().devices.push(device);
    }

    pub fn insert_feedback(&self, feedback: Feedback) {
        self.collections.write().unwrap().feedbacks.push(feedback);
    }
}

#[async_trait]
impl FreshnessRepository for MemoryRepository {
    async fn insert_image(&self, image: &UploadedImage) -> Result<(), RepositoryError> {
        self.write()?.images.push(image.clone());
        Ok(())
    }

    async fn insert_result(&self, result: &PredictionResult) -> Result<(), RepositoryError> {
        self.write()?.results.push(result.clone());
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<UploadedImage>, RepositoryError> {
        Ok(self.read()?.images.clone())
    }

    async fn list_results(&self) -> Result<Vec<PredictionResult>, RepositoryError> {
        Ok(self.read()?.results.clone())
    }

    async fn list_devices(&self, page: Page) -> Result<Vec<Device>, RepositoryError> {
        Ok(self
            .read()?
            .devices
            .iter()
            .skip(page.skip())
            .take(page.per_page)
            .cloned()
            .collect())
    }

    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, RepositoryError> {
        Ok(self.read()?.feedbacks.clone())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        Ok(self
            .read()?
            .admins
            .iter()
            .find(|admin| admin.email == email)
            .cloned())
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), RepositoryError> {
        self.write()?.admins.push(admin.clone());
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<u64, RepositoryError> {
        let collections = self.read()?;
        let len = match collection {
            Collection::Admins => collections.admins.len(),
            Collection::Devices => collections.devices.len(),
            Collection::Images => collections.images.len(),
            Collection::Results => collections.results.len(),
            Collection::Feedbacks => collections.feedbacks.len(),
        };
        Ok(len as u64)
    }
}
