use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use labelwise_core::ids::ScanId;
use labelwise_core::risk::RiskThresholds;
use labelwise_core::types::{Granularity, ScanTrendPoint};
use risk_engine::CompositeScore;

pub mod json;
pub mod summary;
pub mod trends;

pub use summary::{summarize, TrendDirection, TrendSummary};
pub use trends::{aggregate, TrendBucket};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<ScanId>,
    #[serde(with = "time::serde::rfc3339")]
    pub scored_at: OffsetDateTime,
    pub database_version: String,
    #[serde(flatten)]
    pub score: CompositeScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub granularity: Granularity,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub buckets: Vec<TrendBucket>,
    pub summary: TrendSummary,
}

impl ScoreReport {
    pub fn new(
        product_name: Option<String>,
        database_version: impl Into<String>,
        score: CompositeScore,
        scored_at: OffsetDateTime,
    ) -> Self {
        Self {
            product_name,
            scan_id: None,
            scored_at,
            database_version: database_version.into(),
            score,
        }
    }

    pub fn human_summary(&self) -> String {
        let product = self.product_name.as_deref().unwrap_or("This product");
        let mut lines = vec![format!(
            "{product} scores {}/100: {}.",
            self.score.score,
            self.score.risk_level.calm_label()
        )];

        if self.score.reasons.is_empty() {
            lines.push("Nothing on the label lowered the score.".to_string());
        } else {
            for reason in &self.score.reasons {
                lines.push(format!("  -{:<3} {}", reason.points, reason.message));
            }
        }
        if !self.score.unclassified.is_empty() {
            lines.push(format!(
                "Not recognised, so not counted: {}",
                self.score.unclassified.join(", ")
            ));
        }
        if !self.score.personalized {
            lines.push("No personal profile was provided.".to_string());
        }
        if let Some(id) = self.scan_id {
            lines.push(format!("Saved as scan {id}."));
        }
        lines.join("\n")
    }
}

impl TrendReport {
    pub fn build(
        scans: &[ScanTrendPoint],
        granularity: Granularity,
        now: OffsetDateTime,
        thresholds: &RiskThresholds,
    ) -> Self {
        let buckets = aggregate(scans, granularity, now);
        let summary = summarize(&buckets, thresholds);
        Self {
            granularity,
            generated_at: now,
            buckets,
            summary,
        }
    }

    pub fn human_summary(&self) -> String {
        let mut lines: Vec<String> = self
            .buckets
            .iter()
            .map(|bucket| {
                let score = match (bucket.score, bucket.is_future) {
                    (_, true) => "upcoming".to_string(),
                    (Some(score), _) if bucket.carried_forward => format!("{score} (carried)"),
                    (Some(score), _) => format!("{score} ({} scans)", bucket.count),
                    (None, _) => "no data".to_string(),
                };
                format!("{:>6}  {score}", bucket.label)
            })
            .collect();

        let overall = match self.summary.average {
            Some(average) => format!(
                "Average {average} over {} scans, {}.",
                self.summary.scan_count, self.summary.direction
            ),
            None => "No committed scans in this period.".to_string(),
        };
        lines.push(overall);
        lines.join("\n")
    }
}
