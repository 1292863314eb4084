use serde::Serialize;

pub fn render_json<T: Serialize>(report: &T) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrendReport;
    use labelwise_core::risk::RiskThresholds;
    use labelwise_core::types::Granularity;
    use time::macros::datetime;

    #[test]
    fn test_trend_report_json_shape() {
        let report = TrendReport::build(
            &[],
            Granularity::Weekly,
            datetime!(2024-06-13 12:00 UTC),
            &RiskThresholds::default(),
        );
        let value: serde_json::Value = serde_json::from_str(&render_json(&report)).unwrap();
        assert_eq!(value["granularity"], "weekly");
        assert_eq!(value["buckets"].as_array().unwrap().len(), 4);
        assert!(value["buckets"][0]["score"].is_null());
        assert_eq!(value["summary"]["direction"], "stable");
    }
}
