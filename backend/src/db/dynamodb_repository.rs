use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use chrono::{DateTime, Utc};
use shared::{Device, Feedback, PredictedClass, PredictionResult, UploadedImage};
use std::collections::HashMap;
use std::str::FromStr;

use super::repository::{Collection, FreshnessRepository, Page, RepositoryError};
use crate::auth::models::Admin;
use crate::config::TableNames;

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    tables: TableNames,
}

impl DynamoDbRepository {
    pub fn new(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::Admins => &self.tables.admins,
            Collection::Devices => &self.tables.devices,
            Collection::Images => &self.tables.images,
            Collection::Results => &self.tables.results,
            Collection::Feedbacks => &self.tables.feedbacks,
        }
    }

    async fn put(&self, collection: Collection, item: Item) -> Result<(), RepositoryError> {
        let table = self.table(collection);
        match self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
        {
            Ok(_) => {
                log::debug!("Inserted {} item into DynamoDB table '{}'", collection, table);
                Ok(())
            }
            Err(e) => {
                log::error!("DynamoDB put_item failed for table '{}': {:?}", table, e);
                Err(RepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    /// Scans a whole table, following `last_evaluated_key` until the last page.
    async fn scan_all(
        &self,
        collection: Collection,
        filter: Option<(&str, &str, AttributeValue)>,
    ) -> Result<Vec<Item>, RepositoryError> {
        let table = self.table(collection);
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take());
            if let Some((expression, placeholder, value)) = &filter {
                request = request
                    .filter_expression(*expression)
                    .expression_attribute_values(*placeholder, value.clone());
            }

            let output = request.send().await.map_err(|e| {
                log::error!("DynamoDB scan failed for table '{}': {:?}", table, e);
                RepositoryError::DynamoDb(e.to_string())
            })?;

            if let Some(page) = output.items {
                items.extend(page);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!("Scanned {} items from table '{}'", items.len(), table);
        Ok(items)
    }
}

#[async_trait]
impl FreshnessRepository for DynamoDbRepository {
    async fn insert_image(&self, image: &UploadedImage) -> Result<(), RepositoryError> {
        self.put(Collection::Images, image_to_item(image)).await
    }

    async fn insert_result(&self, result: &PredictionResult) -> Result<(), RepositoryError> {
        self.put(Collection::Results, result_to_item(result)).await
    }

    async fn list_images(&self) -> Result<Vec<UploadedImage>, RepositoryError> {
        self.scan_all(Collection::Images, None)
            .await?
            .into_iter()
            .map(item_to_image)
            .collect()
    }

    async fn list_results(&self) -> Result<Vec<PredictionResult>, RepositoryError> {
        self.scan_all(Collection::Results, None)
            .await?
            .into_iter()
            .map(item_to_result)
            .collect()
    }

    async fn list_devices(&self, page: Page) -> Result<Vec<Device>, RepositoryError> {
        self.scan_all(Collection::Devices, None)
            .await?
            .into_iter()
            .skip(page.skip())
            .take(page.per_page)
            .map(item_to_device)
            .collect()
    }

    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, RepositoryError> {
        self.scan_all(Collection::Feedbacks, None)
            .await?
            .into_iter()
            .map(item_to_feedback)
            .collect()
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        let filter = (
            "email = :email",
            ":email",
            AttributeValue::S(email.to_string()),
        );
        self.scan_all(Collection::Admins, Some(filter))
            .await?
            .into_iter()
            .next()
            .map(item_to_admin)
            .transpose()
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), RepositoryError> {
        log::info!("Creating admin {} in table '{}'", admin.email, self.tables.admins);
        self.put(Collection::Admins, admin_to_item(admin)).await
    }

    async fn count(&self, collection: Collection) -> Result<u64, RepositoryError> {
        let table = self.table(collection);
        let mut total: u64 = 0;
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .select(Select::Count)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    log::error!("DynamoDB count scan failed for table '{}': {:?}", table, e);
                    RepositoryError::DynamoDb(e.to_string())
                })?;

            total += u64::try_from(output.count).unwrap_or(0);
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(total)
    }
}

fn image_to_item(image: &UploadedImage) -> Item {
    let mut item = HashMap::new();
    item.insert("image_id".to_string(), AttributeValue::S(image.image_id.clone()));
    item.insert("device_id".to_string(), AttributeValue::S(image.device_id.clone()));
    item.insert(
        "timestamp".to_string(),
        AttributeValue::S(image.timestamp.to_rfc3339()),
    );
    item.insert(
        "storage_path".to_string(),
        AttributeValue::S(image.storage_path.clone()),
    );
    item
}

fn item_to_image(item: Item) -> Result<UploadedImage, RepositoryError> {
    Ok(UploadedImage {
        image_id: required_s(&item, "image_id")?,
        device_id: required_s(&item, "device_id")?,
        timestamp: parse_timestamp(&required_s(&item, "timestamp")?)?,
        storage_path: required_s(&item, "storage_path")?,
    })
}

fn result_to_item(result: &PredictionResult) -> Item {
    let mut item = HashMap::new();
    item.insert("result_id".to_string(), AttributeValue::S(result.result_id.clone()));
    item.insert("image_id".to_string(), AttributeValue::S(result.image_id.clone()));
    item.insert(
        "predicted_class".to_string(),
        AttributeValue::S(result.predicted_class.to_string()),
    );
    if let Some(score) = result.quality_score {
        item.insert("quality_score".to_string(), AttributeValue::N(score.to_string()));
    }
    item.insert("error_flag".to_string(), AttributeValue::Bool(result.error_flag));
    item
}

fn item_to_result(item: Item) -> Result<PredictionResult, RepositoryError> {
    let class_str = required_s(&item, "predicted_class")?;
    let predicted_class = PredictedClass::from_str(&class_str)
        .map_err(|_| RepositoryError::InvalidData(format!("unknown class '{}'", class_str)))?;
    Ok(PredictionResult {
        result_id: required_s(&item, "result_id")?,
        image_id: required_s(&item, "image_id")?,
        predicted_class,
        quality_score: optional_n(&item, "quality_score")?,
        error_flag: flag(&item, "error_flag")?,
    })
}

fn item_to_device(item: Item) -> Result<Device, RepositoryError> {
    Ok(Device {
        device_id: required_s(&item, "device_id")?,
        name: optional_s(&item, "name"),
        location: optional_s(&item, "location"),
        registered_at: optional_s(&item, "registered_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

fn item_to_feedback(item: Item) -> Result<Feedback, RepositoryError> {
    Ok(Feedback {
        feedback_id: required_s(&item, "feedback_id")?,
        device_id: optional_s(&item, "device_id"),
        image_id: optional_s(&item, "image_id"),
        message: optional_s(&item, "message").unwrap_or_default(),
        rating: optional_n(&item, "rating")?,
        created_at: optional_s(&item, "created_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

fn admin_to_item(admin: &Admin) -> Item {
    let mut item = HashMap::new();
    item.insert("admin_id".to_string(), AttributeValue::S(admin.admin_id.clone()));
    item.insert("email".to_string(), AttributeValue::S(admin.email.clone()));
    item.insert(
        "password_hash".to_string(),
        AttributeValue::S(admin.password_hash.clone()),
    );
    item
}

fn item_to_admin(item: Item) -> Result<Admin, RepositoryError> {
    Ok(Admin {
        admin_id: required_s(&item, "admin_id")?,
        email: required_s(&item, "email")?,
        password_hash: required_s(&item, "password_hash")?,
    })
}

fn required_s(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|av| av.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData(format!("missing string attribute '{}'", key)))
}

fn optional_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|av| av.as_s().ok()).cloned()
}

fn optional_n<T: FromStr>(item: &Item, key: &str) -> Result<Option<T>, RepositoryError> {
    match item.get(key).and_then(|av| av.as_n().ok()) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            RepositoryError::InvalidData(format!("attribute '{}' is not a valid number: {}", key, raw))
        }),
        None => Ok(None),
    }
}

/// Flags written as numbers (`0`/`1`) are accepted alongside booleans.
fn flag(item: &Item, key: &str) -> Result<bool, RepositoryError> {
    match item.get(key) {
        Some(AttributeValue::Bool(value)) => Ok(*value),
        Some(AttributeValue::N(raw)) => Ok(raw.trim() != "0"),
        None => Ok(false),
        Some(other) => Err(RepositoryError::InvalidData(format!(
            "attribute '{}' is not a flag: {:?}",
            key, other
        ))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidData(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{QualitySample, summarize_quality};
    use shared::FreshnessLabel;

    #[test]
    fn result_item_keeps_label_and_flag() {
        let result = PredictionResult {
            result_id: "r1".into(),
            image_id: "i1".into(),
            predicted_class: PredictedClass::Label(FreshnessLabel::FreshOrange),
            quality_score: Some(0.95),
            error_flag: false,
        };
        let item = result_to_item(&result);
        assert_eq!(
            item.get("predicted_class"),
            Some(&AttributeValue::S("FreshOrange".into()))
        );
        assert_eq!(item_to_result(item).unwrap(), result);
    }

    #[test]
    fn numeric_error_flags_and_missing_scores_are_tolerated() {
        let mut item = HashMap::new();
        item.insert("result_id".to_string(), AttributeValue::S("r2".into()));
        item.insert("image_id".to_string(), AttributeValue::S("i2".into()));
        item.insert("predicted_class".to_string(), AttributeValue::S("Error".into()));
        item.insert("error_flag".to_string(), AttributeValue::N("1".into()));

        let result = item_to_result(item).unwrap();
        assert!(result.error_flag);
        assert_eq!(result.quality_score, None);
        assert_eq!(result.predicted_class, PredictedClass::Error);
    }

    #[test]
    fn stored_results_without_score_stay_out_of_the_average() {
        let scored = result_to_item(&PredictionResult {
            result_id: "r4".into(),
            image_id: "i4".into(),
            predicted_class: PredictedClass::Label(FreshnessLabel::FreshApple),
            quality_score: Some(0.95),
            error_flag: false,
        });
        let mut unscored = HashMap::new();
        unscored.insert("result_id".to_string(), AttributeValue::S("r5".into()));
        unscored.insert("image_id".to_string(), AttributeValue::S("i5".into()));
        unscored.insert(
            "predicted_class".to_string(),
            AttributeValue::S("RottenApple".into()),
        );
        unscored.insert("error_flag".to_string(), AttributeValue::Bool(false));

        let results: Vec<PredictionResult> = vec![scored, unscored]
            .into_iter()
            .map(item_to_result)
            .collect::<Result<_, _>>()
            .unwrap();
        let (avg, counts) = summarize_quality(results.iter().map(QualitySample::from));

        assert_eq!(avg, 0.95);
        assert_eq!(counts.excellent, 1);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.error, 0);
    }

    #[test]
    fn unscored_result_writes_no_score_attribute() {
        let item = result_to_item(&PredictionResult {
            result_id: "r6".into(),
            image_id: "i6".into(),
            predicted_class: PredictedClass::Error,
            quality_score: None,
            error_flag: true,
        });
        assert!(!item.contains_key("quality_score"));
    }

    #[test]
    fn malformed_items_are_invalid_data() {
        let mut item = HashMap::new();
        item.insert("image_id".to_string(), AttributeValue::S("i3".into()));
        item.insert("device_id".to_string(), AttributeValue::S("d3".into()));
        item.insert("timestamp".to_string(), AttributeValue::S("yesterday".into()));
        item.insert("storage_path".to_string(), AttributeValue::S("/tmp/x".into()));
        assert!(matches!(item_to_image(item), Err(RepositoryError::InvalidData(_))));

        let empty: Item = HashMap::new();
        assert!(matches!(item_to_admin(empty), Err(RepositoryError::InvalidData(_))));
    }

    #[test]
    fn devices_tolerate_sparse_attributes() {
        let mut item = HashMap::new();
        item.insert("device_id".to_string(), AttributeValue::S("cam-7".into()));
        item.insert(
            "registered_at".to_string(),
            AttributeValue::S("2026-03-01T08:00:00Z".into()),
        );
        let device = item_to_device(item).unwrap();
        assert_eq!(device.device_id, "cam-7");
        assert!(device.name.is_none());
        assert!(device.registered_at.is_some());
    }
}
