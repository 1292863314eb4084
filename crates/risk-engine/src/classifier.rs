//! Ingredient classification against the reference table.
//!
//! Names are matched by substring containment of any record key, so an
//! additive embedded in a longer label phrase is still found. When several
//! records match, the most severe tier wins.

use tracing::debug;

use labelwise_core::risk::{Confidence, RiskTier};
use labelwise_core::types::IngredientObservation;

use crate::database::{RecordKeys, RiskDatabase, RiskRecord};

/// Leading aliases of a record that count as specific spellings.
const SPECIFIC_ALIASES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMatch<'a> {
    /// Matched reference record. `None` when only the upstream tier is known.
    pub record: Option<&'a RiskRecord>,
    pub confidence: Confidence,
    pub observation: &'a IngredientObservation,
    /// Position of the observation in the ingredient list.
    pub position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanClassification<'a> {
    pub matches: Vec<ClassifiedMatch<'a>>,
    /// Ingredients neither the table nor the extraction step could place.
    pub unclassified: Vec<&'a IngredientObservation>,
}

impl ClassifiedMatch<'_> {
    /// Tier of the matched record, falling back to the upstream tier.
    pub fn tier(&self) -> Option<RiskTier> {
        self.record
            .map(|record| record.tier)
            .or(self.observation.risk_tier)
    }

    pub fn prominence(&self) -> f32 {
        self.observation.prominence(self.position)
    }
}

/// Matches one observation against the table. An unknown ingredient yields
/// `None`; it is never an error.
pub fn classify<'a>(
    observation: &'a IngredientObservation,
    database: &'a RiskDatabase,
) -> Option<ClassifiedMatch<'a>> {
    let normalized = observation.normalized_name();
    let found = database.matching_record(&normalized)?;
    let confidence = confidence_for(&normalized, found.record, found.keys);
    debug!(
        ingredient = %observation.name,
        record = %found.record.name,
        confidence = %confidence,
        "ingredient classified"
    );
    Some(ClassifiedMatch {
        record: Some(found.record),
        confidence,
        observation,
        position: 0,
    })
}

/// Classifies every ingredient of a scan, keeping list positions.
pub fn classify_scan<'a>(
    observations: &'a [IngredientObservation],
    database: &'a RiskDatabase,
) -> ScanClassification<'a> {
    let mut classification = ScanClassification::default();
    for (position, observation) in observations.iter().enumerate() {
        match classify(observation, database) {
            Some(found) => classification.matches.push(ClassifiedMatch { position, ..found }),
            None if observation.risk_tier.is_some() => {
                classification.matches.push(ClassifiedMatch {
                    record: None,
                    confidence: Confidence::Low,
                    observation,
                    position,
                })
            }
            None => classification.unclassified.push(observation),
        }
    }
    classification
}

fn confidence_for(normalized: &str, record: &RiskRecord, keys: &RecordKeys) -> Confidence {
    let exact = normalized == keys.name
        || keys.alt_name.as_deref() == Some(normalized)
        || keys
            .code
            .as_deref()
            .is_some_and(|code| normalized.contains(code));
    if exact {
        return Confidence::High;
    }

    let specific = record
        .aliases
        .iter()
        .take(SPECIFIC_ALIASES)
        .any(|alias| normalized.contains(alias.as_str()));
    if specific {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
