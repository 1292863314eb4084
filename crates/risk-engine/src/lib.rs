use std::sync::Arc;

use tracing::{info, warn};

use labelwise_core::config::{CategoryProfile, Config};
use labelwise_core::error::LabelwiseError;
use labelwise_core::types::ScanInput;

pub mod classifier;
pub mod database;
pub mod deduction;
mod matcher;
pub mod scoring;

pub use classifier::{classify, classify_scan, ClassifiedMatch, ScanClassification};
pub use database::{DatabaseHandle, RiskDatabase, RiskRecord};
pub use deduction::{calculate_deduction, DeductionEntry, DeductionResult};
pub use scoring::{
    compute_score, BaseSignals, CompositeScore, Personalization, ReasonKind, ScoreReason,
};

/// Scores scans against a swappable reference database.
///
/// The engine is `Sync`; concurrent scans share it by reference. Each scan
/// reads one database snapshot from start to finish.
#[derive(Debug)]
pub struct ScoringEngine {
    config: Config,
    database: DatabaseHandle,
}

impl ScoringEngine {
    pub fn from_config(config: Config, database: RiskDatabase) -> Self {
        Self {
            config,
            database: DatabaseHandle::new(database),
        }
    }

    /// Engine over the built-in table, or the table at `database.path`.
    pub fn load(config: Config) -> anyhow::Result<Self> {
        let database = match &config.database.path {
            Some(path) => RiskDatabase::load(std::path::Path::new(path))?,
            None => RiskDatabase::builtin()?,
        };
        Ok(Self::from_config(config, database))
    }

    pub fn database(&self) -> Arc<RiskDatabase> {
        self.database.snapshot()
    }

    /// Swaps in a new database. Scans already running finish on the old one.
    pub fn reload_database(&self, database: RiskDatabase) -> Arc<RiskDatabase> {
        let previous = self.database.replace(database);
        info!(
            previous = previous.version(),
            current = self.database.snapshot().version(),
            "risk database replaced"
        );
        previous
    }

    pub fn score(&self, scan: &ScanInput) -> Result<scoring::CompositeScore, LabelwiseError> {
        scan.validate()?;
        let database = self.database.snapshot();
        let category = self.category_for(scan);
        let scoring = &self.config.scoring;

        let classification = classify_scan(&scan.ingredients, &database);
        let signals = BaseSignals {
            deduction: calculate_deduction(&classification.matches),
            processing: scoring::processing_penalty(scan.nova_group.as_ref(), category, scoring),
            traffic_lights: scoring::traffic_light_penalty(&scan.nutrition, category, scoring),
            personalization: scoring::personalization_penalty(
                scan.personalization.as_ref(),
                &scan.ingredients,
                &classification.matches,
                &self.config.conditions,
                scoring,
            ),
        };

        let mut score = compute_score(signals, &self.config.thresholds);
        score.unclassified = classification
            .unclassified
            .iter()
            .map(|observation| observation.name.clone())
            .collect();

        info!(
            product = scan.product_name.as_deref().unwrap_or("unnamed"),
            score = score.score,
            risk_level = %score.risk_level,
            database = database.version(),
            "scan scored"
        );
        Ok(score)
    }

    fn category_for(&self, scan: &ScanInput) -> Option<&CategoryProfile> {
        let tag = scan.category.as_deref()?;
        let profile = self.config.category(tag);
        if profile.is_none() {
            warn!(category = tag, "unknown product category, scoring without exemptions");
        }
        profile
    }
}
