use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::LabelwiseError;
use crate::risk::{RiskTier, MAX_SCORE, MIN_SCORE};

/// Bounds of an ingredient's position-in-list weight.
pub const MIN_POSITION_WEIGHT: f32 = 0.4;
pub const MAX_POSITION_WEIGHT: f32 = 1.0;

/// One ingredient as reported for a single scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientObservation {
    pub name: String,
    /// Tier assigned by the upstream extraction step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tier: Option<RiskTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrient_concern: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Sugar,
    Sodium,
    SaturatedFat,
    Fiber,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Amber,
    Red,
}

/// A nutrient value as supplied by the extraction step: either an already
/// decided light or an amount in grams per 100 g. Anything else is kept as
/// `Unreadable` and costs nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NutrientReading {
    Light(TrafficLight),
    PerHundredGrams(f64),
    Unreadable(serde_json::Value),
}

/// NOVA processing group as supplied. Values that are not a small integer
/// are kept as `Unreadable`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NovaGroup {
    Group(u8),
    Unreadable(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<NutrientReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<NutrientReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_fat: Option<NutrientReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<NutrientReading>,
}

/// Declared consumer context. Goals are matched through the same condition
/// table as conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationProfile {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// Structured label data for one scan, as handed over by the extraction step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub ingredients: Vec<IngredientObservation>,
    /// NOVA processing group, 1 to 4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nova_group: Option<NovaGroup>,
    #[serde(default)]
    pub nutrition: NutritionFacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization: Option<PersonalizationProfile>,
}

/// One historical scan fed into trend aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTrendPoint {
    pub score: Option<u8>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Only scans the user opted into their analysis count.
    #[serde(default)]
    pub committed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
}

pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl IngredientObservation {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            risk_tier: None,
            position_weight: None,
            nutrient_concern: None,
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Supplied position weight, or one derived from the list position.
    pub fn prominence(&self, index: usize) -> f32 {
        self.position_weight.unwrap_or_else(|| {
            let derived = MAX_POSITION_WEIGHT - 0.1 * index as f32;
            derived.max(MIN_POSITION_WEIGHT)
        })
    }
}

impl Nutrient {
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Sugar,
        Nutrient::Sodium,
        Nutrient::SaturatedFat,
        Nutrient::Fiber,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Nutrient::Sugar => "sugar",
            Nutrient::Sodium => "sodium",
            Nutrient::SaturatedFat => "saturated fat",
            Nutrient::Fiber => "fiber",
        }
    }

    /// Light for an amount per 100 g. Non-finite or negative amounts carry
    /// no information and yield `None`.
    pub fn light_for(&self, grams: f64) -> Option<TrafficLight> {
        if !grams.is_finite() || grams < 0.0 {
            return None;
        }
        let light = match self {
            Nutrient::Sugar => upper_bounded(grams, 5.0, 22.5),
            Nutrient::Sodium => upper_bounded(grams, 0.12, 0.6),
            Nutrient::SaturatedFat => upper_bounded(grams, 1.5, 5.0),
            Nutrient::Fiber => {
                if grams >= 6.0 {
                    TrafficLight::Green
                } else if grams >= 3.0 {
                    TrafficLight::Amber
                } else {
                    TrafficLight::Red
                }
            }
        };
        Some(light)
    }
}

fn upper_bounded(grams: f64, green_max: f64, amber_max: f64) -> TrafficLight {
    if grams <= green_max {
        TrafficLight::Green
    } else if grams <= amber_max {
        TrafficLight::Amber
    } else {
        TrafficLight::Red
    }
}

impl NutrientReading {
    pub fn light(&self, nutrient: Nutrient) -> Option<TrafficLight> {
        match self {
            NutrientReading::Light(light) => Some(*light),
            NutrientReading::PerHundredGrams(grams) => nutrient.light_for(*grams),
            NutrientReading::Unreadable(_) => None,
        }
    }
}

impl NovaGroup {
    pub fn group(&self) -> Option<u8> {
        match self {
            NovaGroup::Group(group) => Some(*group),
            NovaGroup::Unreadable(_) => None,
        }
    }
}

impl From<u8> for NovaGroup {
    fn from(group: u8) -> Self {
        NovaGroup::Group(group)
    }
}

impl NutritionFacts {
    pub fn reading(&self, nutrient: Nutrient) -> Option<&NutrientReading> {
        match nutrient {
            Nutrient::Sugar => self.sugar.as_ref(),
            Nutrient::Sodium => self.sodium.as_ref(),
            Nutrient::SaturatedFat => self.saturated_fat.as_ref(),
            Nutrient::Fiber => self.fiber.as_ref(),
        }
    }
}

impl PersonalizationProfile {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.goals.is_empty() && self.allergens.is_empty()
    }
}

impl ScanInput {
    pub fn from_json(contents: &str) -> Result<Self, LabelwiseError> {
        let scan: ScanInput = serde_json::from_str(contents)
            .map_err(|err| LabelwiseError::InvalidInput(format!("scan JSON: {err}")))?;
        scan.validate()?;
        Ok(scan)
    }

    pub fn validate(&self) -> Result<(), LabelwiseError> {
        for ingredient in &self.ingredients {
            if let Some(weight) = ingredient.position_weight {
                if !weight.is_finite()
                    || !(MIN_POSITION_WEIGHT..=MAX_POSITION_WEIGHT).contains(&weight)
                {
                    return Err(LabelwiseError::InvalidInput(format!(
                        "position weight {weight} of '{}' outside {MIN_POSITION_WEIGHT}-{MAX_POSITION_WEIGHT}",
                        ingredient.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ScanTrendPoint {
    pub fn validate(&self) -> Result<(), LabelwiseError> {
        match self.score {
            Some(score) if !(MIN_SCORE..=MAX_SCORE).contains(&score) => Err(
                LabelwiseError::InvalidInput(format!("trend score {score} outside 1-100")),
            ),
            _ => Ok(()),
        }
    }
}

/// Parses a JSON array of trend points, rejecting anything that is not one.
pub fn parse_trend_points(contents: &str) -> Result<Vec<ScanTrendPoint>, LabelwiseError> {
    let points: Vec<ScanTrendPoint> = serde_json::from_str(contents)
        .map_err(|err| LabelwiseError::InvalidInput(format!("trend points JSON: {err}")))?;
    for point in &points {
        point.validate()?;
    }
    Ok(points)
}

impl Granularity {
    /// Whether an empty bucket repeats the previous average.
    pub fn carries_forward(&self) -> bool {
        matches!(self, Granularity::Hourly)
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "hourly" | "hour" => Ok(Granularity::Hourly),
            "daily" | "day" => Ok(Granularity::Daily),
            "weekly" | "week" => Ok(Granularity::Weekly),
            _ => Err(format!("unknown granularity: {value}")),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
        };
        write!(f, "{value}")
    }
}
