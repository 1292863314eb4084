//! Composite health score.
//!
//! score = clamp(100 - processing - traffic lights - additives - personalization, 1, 100)
//!
//! Missing or unreadable inputs contribute no penalty. Category exemptions
//! come from [`CategoryProfile`] data, never from the category name itself.

use serde::{Deserialize, Serialize};
use tracing::warn;

use labelwise_core::config::{CategoryProfile, ConditionProfile, ScoringConfig};
use labelwise_core::risk::{RiskLevel, RiskThresholds, MAX_SCORE, MIN_SCORE};
use labelwise_core::types::{
    normalize_name, IngredientObservation, NovaGroup, Nutrient, NutritionFacts,
    PersonalizationProfile, TrafficLight,
};

use crate::classifier::ClassifiedMatch;
use crate::deduction::DeductionResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingPenalty {
    pub nova_group: Option<u8>,
    pub points: u32,
    /// Halved for an essential formulation.
    pub halved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightPenalty {
    pub red: Vec<Nutrient>,
    /// Red nutrients the product category requires, not counted.
    pub excused: Vec<Nutrient>,
    pub points: u32,
}

/// Outcome of the personalization check. `NotProvided` is reported as such
/// so callers can tell "no data" from "no concern".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Personalization {
    #[default]
    NotProvided,
    Evaluated {
        points: u32,
        hits: Vec<String>,
    },
}

/// Everything the composite score is computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseSignals {
    pub deduction: DeductionResult,
    pub processing: ProcessingPenalty,
    pub traffic_lights: TrafficLightPenalty,
    pub personalization: Personalization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Processing,
    TrafficLight,
    Additive,
    Personalization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReason {
    pub kind: ReasonKind,
    pub points: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub reasons: Vec<ScoreReason>,
    pub deduction: DeductionResult,
    /// Whether personalization data was present and evaluated.
    pub personalized: bool,
    /// Ingredients that could not be classified. They cost nothing.
    pub unclassified: Vec<String>,
}

impl Personalization {
    pub fn points(&self) -> u32 {
        match self {
            Personalization::NotProvided => 0,
            Personalization::Evaluated { points, .. } => *points,
        }
    }
}

pub fn processing_penalty(
    nova_group: Option<&NovaGroup>,
    category: Option<&CategoryProfile>,
    config: &ScoringConfig,
) -> ProcessingPenalty {
    let Some(supplied) = nova_group else {
        return ProcessingPenalty::default();
    };
    let Some(group) = supplied.group() else {
        warn!(nova_group = ?supplied, "unreadable NOVA group ignored");
        return ProcessingPenalty::default();
    };
    let Some(points) = config.processing.for_group(group) else {
        warn!(nova_group = group, "NOVA group outside 1-4 ignored");
        return ProcessingPenalty::default();
    };

    let halved = category.is_some_and(|profile| profile.essential_formulation);
    ProcessingPenalty {
        nova_group: Some(group),
        points: if halved { points / 2 } else { points },
        halved,
    }
}

pub fn traffic_light_penalty(
    nutrition: &NutritionFacts,
    category: Option<&CategoryProfile>,
    config: &ScoringConfig,
) -> TrafficLightPenalty {
    let mut penalty = TrafficLightPenalty::default();
    for nutrient in Nutrient::ALL {
        let Some(reading) = nutrition.reading(nutrient) else {
            continue;
        };
        let Some(light) = reading.light(nutrient) else {
            warn!(nutrient = nutrient.label(), "unreadable nutrient value ignored");
            continue;
        };
        if light != TrafficLight::Red {
            continue;
        }
        let required =
            category.is_some_and(|profile| profile.required_nutrients.contains(&nutrient));
        if required {
            penalty.excused.push(nutrient);
        } else {
            penalty.red.push(nutrient);
        }
    }
    penalty.points = penalty.red.len() as u32 * config.traffic_light_penalty;
    penalty
}

/// Checks declared conditions, goals and allergens against the flagged
/// ingredients of a scan: those matched to a record or an upstream tier, and
/// those marked as a nutrient concern.
pub fn personalization_penalty(
    profile: Option<&PersonalizationProfile>,
    observations: &[IngredientObservation],
    matches: &[ClassifiedMatch<'_>],
    conditions: &[ConditionProfile],
    config: &ScoringConfig,
) -> Personalization {
    let Some(profile) = profile.filter(|profile| !profile.is_empty()) else {
        return Personalization::NotProvided;
    };

    let mut flagged: Vec<(String, Option<String>)> = matches
        .iter()
        .map(|found| {
            (
                found.observation.normalized_name(),
                found.record.map(|record| normalize_name(&record.category)),
            )
        })
        .collect();
    flagged.extend(
        observations
            .iter()
            .filter(|observation| observation.nutrient_concern == Some(true))
            .map(|observation| (observation.normalized_name(), None)),
    );

    let mut hits = Vec::new();
    for allergen in &profile.allergens {
        let allergen = normalize_name(allergen);
        if allergen.is_empty() {
            continue;
        }
        if let Some((name, _)) = flagged.iter().find(|(name, _)| name.contains(&allergen)) {
            hits.push(format!("allergen {allergen} in {name}"));
        }
    }

    for declared in profile.conditions.iter().chain(&profile.goals) {
        let declared = normalize_name(declared);
        if declared.is_empty() {
            continue;
        }
        let keywords: Vec<String> = conditions
            .iter()
            .find(|condition| normalize_name(&condition.name) == declared)
            .map(|condition| condition.keywords.iter().map(|k| normalize_name(k)).collect())
            .unwrap_or_else(|| vec![declared.clone()]);

        let hit = flagged.iter().find(|(name, category)| {
            keywords.iter().filter(|k| !k.is_empty()).any(|keyword| {
                name.contains(keyword.as_str())
                    || category.as_deref().is_some_and(|c| c.contains(keyword.as_str()))
            })
        });
        if let Some((name, _)) = hit {
            hits.push(format!("{declared} concern: {name}"));
        }
    }

    let points = if hits.is_empty() {
        0
    } else {
        config.personalization_penalty
    };
    Personalization::Evaluated { points, hits }
}

pub fn compute_score(signals: BaseSignals, thresholds: &RiskThresholds) -> CompositeScore {
    let BaseSignals {
        deduction,
        processing,
        traffic_lights,
        personalization,
    } = signals;

    let mut reasons = Vec::new();
    if processing.points > 0 {
        let group = processing.nova_group.unwrap_or_default();
        let message = if processing.halved {
            format!("NOVA group {group} processing (halved for essential formulation)")
        } else {
            format!("NOVA group {group} processing")
        };
        reasons.push(ScoreReason {
            kind: ReasonKind::Processing,
            points: processing.points,
            message,
        });
    }
    for nutrient in &traffic_lights.red {
        reasons.push(ScoreReason {
            kind: ReasonKind::TrafficLight,
            points: traffic_lights.points / traffic_lights.red.len() as u32,
            message: format!("high {}", nutrient.label()),
        });
    }
    for entry in &deduction.breakdown {
        reasons.push(ScoreReason {
            kind: ReasonKind::Additive,
            points: u32::from(entry.points),
            message: entry.reason(),
        });
    }
    if let Personalization::Evaluated { points, hits } = &personalization {
        if *points > 0 {
            reasons.push(ScoreReason {
                kind: ReasonKind::Personalization,
                points: *points,
                message: hits.join("; "),
            });
        }
    }

    let total = processing.points
        + traffic_lights.points
        + deduction.total_deduction
        + personalization.points();
    let score = u32::from(MAX_SCORE)
        .saturating_sub(total)
        .clamp(u32::from(MIN_SCORE), u32::from(MAX_SCORE)) as u8;

    CompositeScore {
        score,
        risk_level: RiskLevel::from_score(score, thresholds),
        reasons,
        deduction,
        personalized: matches!(personalization, Personalization::Evaluated { .. }),
        unclassified: Vec::new(),
    }
}
