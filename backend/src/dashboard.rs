use shared::{CollectionCounts, DashboardSummary, PredictionResult, QualityCounts};

use crate::db::repository::{Collection, FreshnessRepository, RepositoryError};

/// Score above which a result counts as excellent.
pub const EXCELLENT_THRESHOLD: f64 = 0.5;

/// The two fields of a stored result the dashboard looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySample {
    pub quality_score: Option<f64>,
    pub error_flag: bool,
}

impl From<&PredictionResult> for QualitySample {
    fn from(result: &PredictionResult) -> Self {
        Self {
            quality_score: result.quality_score,
            error_flag: result.error_flag,
        }
    }
}

/// Single pass over the samples: average of present scores (2 decimals) and bucket counts.
///
/// Missing scores count as 0 for bucketing but are left out of the average.
pub fn summarize_quality<I>(samples: I) -> (f64, QualityCounts)
where
    I: IntoIterator<Item = QualitySample>,
{
    let mut counts = QualityCounts::default();
    let mut sum = 0.0;
    let mut scored = 0u64;

    for sample in samples {
        if let Some(score) = sample.quality_score {
            sum += score;
            scored += 1;
        }
        let score = sample.quality_score.unwrap_or(0.0);
        if score > EXCELLENT_THRESHOLD {
            counts.excellent += 1;
        } else if !sample.error_flag {
            counts.low += 1;
        }
        if sample.error_flag {
            counts.error += 1;
        }
    }

    let average = if scored == 0 {
        0.0
    } else {
        round2(sum / scored as f64)
    };
    (average, counts)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub async fn build_summary(
    repo: &dyn FreshnessRepository,
) -> Result<DashboardSummary, RepositoryError> {
    let counts = CollectionCounts {
        admins: repo.count(Collection::Admins).await?,
        devices: repo.count(Collection::Devices).await?,
        images: repo.count(Collection::Images).await?,
        feedbacks: repo.count(Collection::Feedbacks).await?,
    };

    let results = repo.list_results().await?;
    let (avg_quality_score, quality_counts) =
        summarize_quality(results.iter().map(QualitySample::from));

    Ok(DashboardSummary {
        counts,
        avg_quality_score,
        quality_counts,
    })
}
