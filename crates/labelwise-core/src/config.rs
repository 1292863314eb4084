use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::LabelwiseError;
use crate::risk::{RiskThresholds, MAX_SCORE, MIN_SCORE};
use crate::types::{normalize_name, Granularity, Nutrient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub thresholds: RiskThresholds,
    pub database: DatabaseConfig,
    pub trend: TrendConfig,
    pub logging: LoggingConfig,
    pub categories: Vec<CategoryProfile>,
    pub conditions: Vec<ConditionProfile>,
}

/// Point costs of the non-additive score signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub processing: ProcessingPenalties,
    /// Points per red-flagged nutrient.
    pub traffic_light_penalty: u32,
    /// Flat penalty when a declared condition or allergen hits a flagged ingredient.
    pub personalization_penalty: u32,
}

/// Penalty per NOVA processing group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingPenalties {
    pub nova_1: u32,
    pub nova_2: u32,
    pub nova_3: u32,
    pub nova_4: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Replaces the embedded reference table when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub default_granularity: Granularity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Product category with gentler scoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub tag: String,
    /// Medically or nutritionally essential formulation: processing penalty is halved.
    pub essential_formulation: bool,
    /// Nutrients the formulation needs; red lights on them are not counted.
    #[serde(default)]
    pub required_nutrients: Vec<Nutrient>,
}

/// Keywords that make an ingredient relevant to a declared condition or goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionProfile {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub history_path: PathBuf,
}

impl ProcessingPenalties {
    /// Penalty for a NOVA group; values outside 1-4 carry none.
    pub fn for_group(&self, group: u8) -> Option<u32> {
        match group {
            1 => Some(self.nova_1),
            2 => Some(self.nova_2),
            3 => Some(self.nova_3),
            4 => Some(self.nova_4),
            _ => None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            processing: ProcessingPenalties {
                nova_1: 0,
                nova_2: 5,
                nova_3: 10,
                nova_4: 20,
            },
            traffic_light_penalty: 10,
            personalization_penalty: 15,
        }
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            thresholds: RiskThresholds::default(),
            database: DatabaseConfig::default(),
            trend: TrendConfig {
                default_granularity: Granularity::Daily,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            categories: vec![
                CategoryProfile {
                    tag: "infant_formula".to_string(),
                    essential_formulation: true,
                    required_nutrients: vec![Nutrient::Sugar, Nutrient::SaturatedFat],
                },
                CategoryProfile {
                    tag: "medical_nutrition".to_string(),
                    essential_formulation: true,
                    required_nutrients: vec![Nutrient::Sodium, Nutrient::Sugar],
                },
            ],
            conditions: vec![
                condition("hypertension", &["sodium", "salt", "msg", "glutamate", "nitrite"]),
                condition("diabetes", &["sugar", "syrup", "fructose", "glucose", "maltodextrin", "dextrose"]),
                condition("weight_loss", &["sugar", "syrup", "hydrogenated", "maltodextrin"]),
                condition("heart_health", &["hydrogenated", "trans fat", "sodium", "palm oil"]),
                condition("pregnancy", &["nitrite", "nitrate", "aspartame", "saccharin"]),
            ],
        }
    }

    /// Looks a category up by tag, ignoring case and surrounding whitespace.
    pub fn category(&self, tag: &str) -> Option<&CategoryProfile> {
        let wanted = normalize_name(tag);
        self.categories
            .iter()
            .find(|profile| normalize_name(&profile.tag) == wanted)
    }

    pub fn validate(&self) -> Result<(), LabelwiseError> {
        let thresholds = &self.thresholds;
        if thresholds.high_risk_max >= thresholds.low_risk_min {
            return Err(LabelwiseError::InvalidConfig(format!(
                "high_risk_max ({}) must be below low_risk_min ({})",
                thresholds.high_risk_max, thresholds.low_risk_min
            )));
        }
        if thresholds.low_risk_min > MAX_SCORE || thresholds.high_risk_max < MIN_SCORE {
            return Err(LabelwiseError::InvalidConfig(
                "risk thresholds must lie within 1-100".to_string(),
            ));
        }

        let mut tags = HashSet::new();
        for profile in &self.categories {
            if !tags.insert(normalize_name(&profile.tag)) {
                return Err(LabelwiseError::InvalidConfig(format!(
                    "duplicate category tag: {}",
                    profile.tag
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let output = toml::to_string_pretty(self).context("render config TOML")?;
        Ok(output)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config at {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    /// Loads the file when present, otherwise the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let contents = self.to_toml_string()?;
        fs::write(path, contents).with_context(|| format!("write config at {}", path.display()))?;
        Ok(())
    }
}

fn condition(name: &str, keywords: &[&str]) -> ConditionProfile {
    ConditionProfile {
        name: name.to_string(),
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
    }
}

impl ConfigPaths {
    pub fn resolve() -> Result<Self> {
        let project_dirs = ProjectDirs::from("io", "labelwise", "labelwise")
            .ok_or_else(|| anyhow::anyhow!("unable to determine project directories"))?;
        let config_dir = project_dirs.config_dir();
        let data_dir = project_dirs.data_dir();
        Ok(Self {
            config_path: config_dir.join("config.toml"),
            data_dir: data_dir.to_path_buf(),
            history_path: data_dir.join("history.json"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default_config();
        let rendered = config.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.thresholds, config.thresholds);
        assert_eq!(parsed.categories, config.categories);
        assert_eq!(parsed.conditions.len(), config.conditions.len());
        assert_eq!(parsed.scoring.processing.nova_4, 20);
        assert!(parsed.database.path.is_none());
    }

    #[test]
    fn test_category_lookup_ignores_case() {
        let config = Config::default_config();
        let profile = config.category(" Infant_Formula ").unwrap();
        assert!(profile.essential_formulation);
        assert!(config.category("snack").is_none());
    }

    #[test]
    fn test_rejects_overlapping_thresholds() {
        let mut config = Config::default_config();
        config.thresholds.high_risk_max = 75;
        assert!(matches!(
            config.validate(),
            Err(LabelwiseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_category_tags() {
        let mut config = Config::default_config();
        let duplicate = config.categories[0].clone();
        config.categories.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_processing_penalty_lookup() {
        let penalties = ScoringConfig::default().processing;
        assert_eq!(penalties.for_group(1), Some(0));
        assert_eq!(penalties.for_group(4), Some(20));
        assert_eq!(penalties.for_group(0), None);
        assert_eq!(penalties.for_group(5), None);
    }
}
