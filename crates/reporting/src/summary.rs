use std::fmt;

use serde::{Deserialize, Serialize};

use labelwise_core::risk::{RiskLevel, RiskThresholds};

use crate::trends::TrendBucket;

/// Minimum score change between the first and last measured bucket that
/// counts as a trend.
pub const TREND_DELTA: i16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Scan-weighted average over measured buckets.
    pub average: Option<u8>,
    pub scan_count: u32,
    pub risk_level: Option<RiskLevel>,
    pub direction: TrendDirection,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        };
        write!(f, "{label}")
    }
}

/// Carried-forward buckets repeat an earlier value and are left out.
pub fn summarize(buckets: &[TrendBucket], thresholds: &RiskThresholds) -> TrendSummary {
    let measured: Vec<(u8, u32)> = buckets
        .iter()
        .filter(|bucket| !bucket.carried_forward && bucket.count > 0)
        .filter_map(|bucket| bucket.score.map(|score| (score, bucket.count)))
        .collect();

    let total: u64 = measured.iter().map(|(_, count)| u64::from(*count)).sum();
    let average = if total == 0 {
        None
    } else {
        let weighted: u64 = measured
            .iter()
            .map(|(score, count)| u64::from(*score) * u64::from(*count))
            .sum();
        Some(((2 * weighted + total) / (2 * total)) as u8)
    };
    let scan_count = u32::try_from(total).unwrap_or(u32::MAX);

    let direction = match (measured.first(), measured.last()) {
        (Some((first, _)), Some((last, _))) if measured.len() > 1 => {
            let delta = i16::from(*last) - i16::from(*first);
            if delta >= TREND_DELTA {
                TrendDirection::Improving
            } else if delta <= -TREND_DELTA {
                TrendDirection::Declining
            } else {
                TrendDirection::Stable
            }
        }
        _ => TrendDirection::Stable,
    };

    TrendSummary {
        average,
        scan_count,
        risk_level: average.map(|score| RiskLevel::from_score(score, thresholds)),
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn bucket(score: Option<u8>, count: u32, carried_forward: bool) -> TrendBucket {
        TrendBucket {
            label: "Mon".to_string(),
            start: datetime!(2024-06-10 00:00 UTC),
            score,
            count,
            carried_forward,
            is_future: false,
        }
    }

    #[test]
    fn test_weighted_average_skips_carried_values() {
        let buckets = vec![
            bucket(Some(40), 1, false),
            bucket(Some(40), 0, true),
            bucket(Some(80), 3, false),
            bucket(None, 0, false),
        ];
        let summary = summarize(&buckets, &RiskThresholds::default());
        assert_eq!(summary.average, Some(70));
        assert_eq!(summary.scan_count, 4);
        assert_eq!(summary.risk_level, Some(RiskLevel::Medium));
        assert_eq!(summary.direction, TrendDirection::Improving);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let buckets = vec![
            bucket(Some(100), 40_000_000, false),
            bucket(Some(90), 40_000_000, false),
        ];
        let summary = summarize(&buckets, &RiskThresholds::default());
        assert_eq!(summary.average, Some(95));
        assert_eq!(summary.scan_count, 80_000_000);
    }

    #[test]
    fn test_declining_and_stable() {
        let thresholds = RiskThresholds::default();
        let declining = vec![bucket(Some(90), 1, false), bucket(Some(60), 1, false)];
        assert_eq!(
            summarize(&declining, &thresholds).direction,
            TrendDirection::Declining
        );

        let stable = vec![bucket(Some(60), 1, false), bucket(Some(64), 2, false)];
        assert_eq!(
            summarize(&stable, &thresholds).direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_no_data() {
        let buckets = vec![bucket(None, 0, false), bucket(None, 0, false)];
        let summary = summarize(&buckets, &RiskThresholds::default());
        assert_eq!(summary.average, None);
        assert_eq!(summary.scan_count, 0);
        assert_eq!(summary.risk_level, None);
        assert_eq!(summary.direction, TrendDirection::Stable);
    }
}
