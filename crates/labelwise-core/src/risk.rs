use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Best possible health score.
pub const MAX_SCORE: u8 = 100;
/// Absolute floor of the health score. A scan never scores 0.
pub const MIN_SCORE: u8 = 1;
/// Cap on the summed additive deduction of one scan.
pub const MAX_DEDUCTION: u32 = 100;

/// Severity tier of a reference additive. Variants are declared from most to
/// least severe, so the derived ordering sorts the worst offenders first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

/// Score bucket reported alongside a health score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// How exactly an ingredient name matched a reference record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Score cutoffs shared by the scorer and the trend layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskThresholds {
    /// Scores at or above this value are low risk.
    pub low_risk_min: u8,
    /// Scores at or below this value are high risk.
    pub high_risk_max: u8,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    /// Point cost a record of this tier may carry.
    pub fn point_range(&self) -> RangeInclusive<u8> {
        match self {
            RiskTier::High => 10..=30,
            RiskTier::Medium => 5..=10,
            RiskTier::Low => 1..=3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::High => "high-risk",
            RiskTier::Medium => "medium-risk",
            RiskTier::Low => "low-risk",
        }
    }
}

impl RiskLevel {
    pub fn from_score(score: u8, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.low_risk_min {
            RiskLevel::Low
        } else if score <= thresholds.high_risk_max {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }

    pub fn calm_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "a good choice",
            RiskLevel::Medium => "fine in moderation",
            RiskLevel::High => "best avoided",
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_risk_min: 71,
            high_risk_max: 30,
        }
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "high" => Ok(RiskTier::High),
            "medium" => Ok(RiskTier::Medium),
            "low" => Ok(RiskTier::Low),
            _ => Err(format!("unknown risk tier: {value}")),
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RiskTier::High => "high",
            RiskTier::Medium => "medium",
            RiskTier::Low => "low",
        };
        write!(f, "{value}")
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{value}")
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{value}")
    }
}
