//! Calendar bucketing of scored scans.
//!
//! Bucket boundaries come from `now` alone. Only committed scans with a
//! score are counted, and a bucket in the future never shows a score.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, Time, Weekday};
use tracing::{debug, warn};

use labelwise_core::risk::{RiskLevel, RiskThresholds, MAX_SCORE, MIN_SCORE};
use labelwise_core::types::{Granularity, ScanTrendPoint};

const HOURLY_BUCKETS: i64 = 7;
const DAILY_BUCKETS: i64 = 7;
const WEEKLY_BUCKETS: i64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// Rounded mean of the bucket's scans. `None` means no data.
    pub score: Option<u8>,
    pub count: u32,
    /// Score repeated from the previous hour rather than measured.
    pub carried_forward: bool,
    pub is_future: bool,
}

impl TrendBucket {
    pub fn risk_level(&self, thresholds: &RiskThresholds) -> Option<RiskLevel> {
        self.score
            .map(|score| RiskLevel::from_score(score, thresholds))
    }
}

struct Window {
    label: String,
    start: OffsetDateTime,
    end: OffsetDateTime,
    is_future: bool,
}

impl Window {
    fn contains(&self, timestamp: OffsetDateTime) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

pub fn aggregate(
    scans: &[ScanTrendPoint],
    granularity: Granularity,
    now: OffsetDateTime,
) -> Vec<TrendBucket> {
    let mut buckets = Vec::new();
    let mut last_score = None;

    for window in windows(granularity, now) {
        let scores: Vec<u8> = scans
            .iter()
            .filter(|scan| scan.committed && window.contains(scan.timestamp))
            .filter_map(|scan| scan.score)
            .filter(|score| {
                let valid = (MIN_SCORE..=MAX_SCORE).contains(score);
                if !valid {
                    warn!(score, "trend score outside 1-100 ignored");
                }
                valid
            })
            .collect();

        let mut bucket = TrendBucket {
            label: window.label,
            start: window.start,
            score: None,
            count: 0,
            carried_forward: false,
            is_future: window.is_future,
        };

        if !bucket.is_future {
            if scores.is_empty() {
                if granularity.carries_forward() && last_score.is_some() {
                    bucket.score = last_score;
                    bucket.carried_forward = true;
                }
            } else {
                bucket.count = scores.len() as u32;
                bucket.score = Some(rounded_mean(&scores));
                last_score = bucket.score;
            }
        }

        debug!(
            label = %bucket.label,
            score = ?bucket.score,
            count = bucket.count,
            carried = bucket.carried_forward,
            future = bucket.is_future,
            "trend bucket"
        );
        buckets.push(bucket);
    }

    buckets
}

fn windows(granularity: Granularity, now: OffsetDateTime) -> Vec<Window> {
    let day_start = now.replace_time(Time::MIDNIGHT);
    let week_start = day_start - Duration::days(i64::from(now.weekday().number_days_from_monday()));

    match granularity {
        Granularity::Hourly => {
            let hour_start = day_start + Duration::hours(i64::from(now.hour()));
            (0..HOURLY_BUCKETS)
                .rev()
                .map(|back| {
                    let start = hour_start - Duration::hours(back);
                    Window {
                        label: format!("{:02}:00", start.hour()),
                        start,
                        end: current_bounded(back, start + Duration::HOUR, now),
                        is_future: start > now,
                    }
                })
                .collect()
        }
        Granularity::Daily => (0..DAILY_BUCKETS)
            .map(|offset| {
                let start = week_start + Duration::days(offset);
                Window {
                    label: weekday_label(start.weekday()).to_string(),
                    start,
                    end: start + Duration::DAY,
                    is_future: start > day_start,
                }
            })
            .collect(),
        Granularity::Weekly => (0..WEEKLY_BUCKETS)
            .rev()
            .map(|back| {
                let start = week_start - Duration::weeks(back);
                Window {
                    label: format!("W{:02}", start.iso_week()),
                    start,
                    end: current_bounded(back, start + Duration::WEEK, now),
                    is_future: start > now,
                }
            })
            .collect(),
    }
}

/// The bucket in progress only covers what has happened up to `now`.
fn current_bounded(back: i64, nominal_end: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    if back == 0 {
        nominal_end.min(now + Duration::NANOSECOND)
    } else {
        nominal_end
    }
}

/// Half-up mean of scores already known to be within 1..=100.
pub(crate) fn rounded_mean(scores: &[u8]) -> u8 {
    let sum: u64 = scores.iter().map(|&score| u64::from(score)).sum();
    let count = scores.len() as u64;
    ((2 * sum + count) / (2 * count)) as u8
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn point(score: u8, timestamp: OffsetDateTime) -> ScanTrendPoint {
        ScanTrendPoint {
            score: Some(score),
            timestamp,
            committed: true,
        }
    }

    fn scores(buckets: &[TrendBucket]) -> Vec<Option<u8>> {
        buckets.iter().map(|bucket| bucket.score).collect()
    }

    #[test]
    fn test_weekly_current_week_only() {
        // Thursday: three days of the week have elapsed.
        let now = datetime!(2024-06-13 15:00 UTC);
        let scans = vec![
            point(80, datetime!(2024-06-11 09:00 UTC)),
            point(60, datetime!(2024-06-12 18:30 UTC)),
        ];

        let buckets = aggregate(&scans, Granularity::Weekly, now);
        assert_eq!(buckets.len(), 4);
        assert_eq!(scores(&buckets), vec![None, None, None, Some(70)]);
        assert_eq!(buckets[3].count, 2);
        assert_eq!(buckets[3].label, "W24");
        assert_eq!(buckets[0].label, "W21");
        assert!(buckets.iter().all(|bucket| !bucket.carried_forward));
    }

    #[test]
    fn test_weekly_current_bucket_ends_at_now() {
        let now = datetime!(2024-06-13 15:00 UTC);
        let scans = vec![
            point(40, datetime!(2024-06-13 15:00 UTC)),
            point(90, datetime!(2024-06-14 08:00 UTC)),
        ];
        let buckets = aggregate(&scans, Granularity::Weekly, now);
        assert_eq!(buckets[3].score, Some(40));
        assert_eq!(buckets[3].count, 1);
    }

    #[test]
    fn test_hourly_carries_forward_daily_does_not() {
        let hourly_now = datetime!(2024-06-13 12:30 UTC);
        let scans = vec![point(60, datetime!(2024-06-13 10:15 UTC))];
        let hourly = aggregate(&scans, Granularity::Hourly, hourly_now);
        assert_eq!(hourly.len(), 7);
        assert_eq!(hourly[0].label, "06:00");
        assert_eq!(hourly[6].label, "12:00");
        assert_eq!(
            scores(&hourly),
            vec![None, None, None, None, Some(60), Some(60), Some(60)]
        );
        assert!(hourly[5].carried_forward);
        assert_eq!(hourly[5].count, 0);

        // Wednesday, with a scan on Monday only.
        let daily_now = datetime!(2024-06-12 12:30 UTC);
        let scans = vec![point(60, datetime!(2024-06-10 10:15 UTC))];
        let daily = aggregate(&scans, Granularity::Daily, daily_now);
        assert_eq!(daily.len(), 7);
        assert_eq!(daily[0].label, "Mon");
        assert_eq!(scores(&daily[..3]), vec![Some(60), None, None]);
    }

    #[test]
    fn test_future_buckets_are_null() {
        let now = datetime!(2024-06-12 08:00 UTC);
        let scans = vec![
            point(70, datetime!(2024-06-12 20:00 UTC)),
            point(30, datetime!(2024-06-14 09:00 UTC)),
        ];
        let daily = aggregate(&scans, Granularity::Daily, now);

        // Today is not future even though the scan is later than now.
        assert!(!daily[2].is_future);
        assert_eq!(daily[2].score, Some(70));
        assert!(daily[4].is_future);
        assert_eq!(daily[4].score, None);
        assert_eq!(daily[4].count, 0);
        assert!(daily[3..].iter().all(|bucket| bucket.is_future));
    }

    #[test]
    fn test_uncommitted_scans_excluded() {
        let now = datetime!(2024-06-12 12:00 UTC);
        let mut draft = point(10, datetime!(2024-06-11 09:00 UTC));
        draft.committed = false;
        let unscored = ScanTrendPoint {
            score: None,
            timestamp: datetime!(2024-06-11 10:00 UTC),
            committed: true,
        };
        let scans = vec![draft, unscored, point(90, datetime!(2024-06-11 11:00 UTC))];

        let daily = aggregate(&scans, Granularity::Daily, now);
        assert_eq!(daily[1].score, Some(90));
        assert_eq!(daily[1].count, 1);
    }

    #[test]
    fn test_hourly_current_bucket_ends_at_now() {
        let now = datetime!(2024-06-13 12:30 UTC);
        let scans = vec![
            point(50, datetime!(2024-06-13 12:10 UTC)),
            point(90, datetime!(2024-06-13 12:45 UTC)),
        ];
        let hourly = aggregate(&scans, Granularity::Hourly, now);
        assert_eq!(hourly[6].score, Some(50));
        assert_eq!(hourly[6].count, 1);
    }

    #[test]
    fn test_out_of_range_scores_ignored() {
        let now = datetime!(2024-06-12 12:00 UTC);
        let scans = vec![
            point(0, datetime!(2024-06-10 08:00 UTC)),
            point(250, datetime!(2024-06-10 09:00 UTC)),
            point(60, datetime!(2024-06-10 10:00 UTC)),
            point(200, datetime!(2024-06-11 10:00 UTC)),
        ];
        let daily = aggregate(&scans, Granularity::Daily, now);
        assert_eq!(daily[0].score, Some(60));
        assert_eq!(daily[0].count, 1);
        assert_eq!(daily[1].score, None);
        assert_eq!(daily[1].count, 0);
    }

    #[test]
    fn test_rounded_mean_of_many_scores() {
        let scores = vec![100u8; 30_000_000];
        assert_eq!(rounded_mean(&scores), 100);
    }

    #[test]
    fn test_rounded_mean_rounds_half_up() {
        assert_eq!(rounded_mean(&[80, 60]), 70);
        assert_eq!(rounded_mean(&[70, 71]), 71);
        assert_eq!(rounded_mean(&[1, 1, 2]), 1);
    }

    #[test]
    fn test_bucket_risk_level() {
        let now = datetime!(2024-06-12 12:00 UTC);
        let scans = vec![point(25, datetime!(2024-06-10 09:00 UTC))];
        let daily = aggregate(&scans, Granularity::Daily, now);
        let thresholds = RiskThresholds::default();
        assert_eq!(daily[0].risk_level(&thresholds), Some(RiskLevel::High));
        assert_eq!(daily[1].risk_level(&thresholds), None);
    }
}
