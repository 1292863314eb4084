pub mod config;
pub mod error;
pub mod ids;
pub mod risk;
pub mod store;
pub mod types;

pub use config::{CategoryProfile, ConditionProfile, Config, ConfigPaths, ScoringConfig};
pub use error::LabelwiseError;
pub use ids::ScanId;
pub use risk::{Confidence, RiskLevel, RiskThresholds, RiskTier};
pub use store::{ScanHistory, ScanRecord};
pub use types::{
    Granularity, IngredientObservation, NovaGroup, Nutrient, NutrientReading, NutritionFacts,
    PersonalizationProfile, ScanInput, ScanTrendPoint, TrafficLight,
};
