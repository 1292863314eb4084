use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use labelwise_core::risk::{Confidence, RiskTier, MAX_DEDUCTION};

use crate::classifier::ClassifiedMatch;

/// One distinct reference record charged against a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionEntry {
    pub name: String,
    pub code: Option<String>,
    pub tier: RiskTier,
    pub points: u8,
    pub category: String,
    pub confidence: Confidence,
    /// Label text the record was found in.
    pub matched_ingredient: String,
    pub prominence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductionResult {
    /// Sum of the breakdown points, capped at 100.
    pub total_deduction: u32,
    /// Worst offenders first: by tier, then points descending.
    pub breakdown: Vec<DeductionEntry>,
}

impl DeductionEntry {
    pub fn reason(&self) -> String {
        let label = match &self.code {
            Some(code) => format!("{} ({})", self.name, code),
            None => self.name.clone(),
        };
        format!("{label}: {} {}", self.tier.label(), self.category)
    }
}

/// Sums the points of the distinct records matched in one scan. A record
/// found through several ingredients or aliases is charged once, with the
/// details of its first occurrence.
pub fn calculate_deduction(matches: &[ClassifiedMatch<'_>]) -> DeductionResult {
    let mut seen = HashSet::new();
    let mut breakdown = Vec::new();

    for found in matches {
        let Some(record) = found.record else {
            continue;
        };
        if !seen.insert(record.name.as_str()) {
            continue;
        }
        breakdown.push(DeductionEntry {
            name: record.name.clone(),
            code: record.code.clone(),
            tier: record.tier,
            points: record.points,
            category: record.category.clone(),
            confidence: found.confidence,
            matched_ingredient: found.observation.name.clone(),
            prominence: found.prominence(),
        });
    }

    // Stable, so equal entries keep first-seen order.
    breakdown.sort_by(|a, b| a.tier.cmp(&b.tier).then(b.points.cmp(&a.points)));

    let total: u32 = breakdown.iter().map(|entry| u32::from(entry.points)).sum();
    DeductionResult {
        total_deduction: total.min(MAX_DEDUCTION),
        breakdown,
    }
}
