use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Label recorded when classification fails.
pub const ERROR_LABEL: &str = "Error";

/// The 20 produce/freshness classes, in the index order the weights were trained with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
pub enum FreshnessLabel {
    FreshApple,
    FreshBanana,
    FreshMango,
    FreshOrange,
    FreshStrawberry,
    RottenApple,
    RottenBanana,
    RottenMango,
    RottenOrange,
    RottenStrawberry,
    FreshCarrot,
    FreshPotato,
    FreshTomato,
    FreshCucumber,
    FreshBellpepper,
    RottenCarrot,
    RottenPotato,
    RottenTomato,
    RottenCucumber,
    RottenBellpepper,
}

impl FreshnessLabel {
    /// Maps a logit index to its label. Indices outside the label set yield `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }
}

/// Outcome of a classification as it is persisted: a label or the error sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PredictedClass {
    Label(FreshnessLabel),
    Error,
}

impl fmt::Display for PredictedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictedClass::Label(label) => write!(f, "{}", label),
            PredictedClass::Error => f.write_str(ERROR_LABEL),
        }
    }
}

impl FromStr for PredictedClass {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ERROR_LABEL {
            return Ok(PredictedClass::Error);
        }
        FreshnessLabel::from_str(s).map(PredictedClass::Label)
    }
}

impl From<PredictedClass> for String {
    fn from(class: PredictedClass) -> Self {
        class.to_string()
    }
}

impl TryFrom<String> for PredictedClass {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, strum::ParseError> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadedImage {
    pub image_id: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub storage_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub result_id: String,
    pub image_id: String,
    pub predicted_class: PredictedClass,
    /// Absent on records written without a score.
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub error_flag: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadResponse {
    pub image: UploadedImage,
    pub result: PredictionResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Device {
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Feedback {
    pub feedback_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub admins: u64,
    pub devices: u64,
    pub images: u64,
    pub feedbacks: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct QualityCounts {
    pub excellent: u64,
    pub low: u64,
    pub error: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub counts: CollectionCounts,
    pub avg_quality_score: f64,
    pub quality_counts: QualityCounts,
}
