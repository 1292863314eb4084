use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use labelwise_core::risk::RiskThresholds;
use labelwise_core::store::ScanHistory;
use labelwise_core::types::{parse_trend_points, Granularity};
use reporting::json::render_json;
use reporting::TrendReport;

#[derive(Debug)]
pub struct TrendInputs {
    pub granularity: Granularity,
    pub thresholds: RiskThresholds,
    pub history_path: PathBuf,
    pub input: Option<PathBuf>,
    pub now: Option<String>,
    pub json: bool,
}

pub fn execute(inputs: TrendInputs) -> Result<()> {
    let points = match &inputs.input {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read trend points {}", path.display()))?;
            parse_trend_points(&contents)
                .with_context(|| format!("parse trend points {}", path.display()))?
        }
        None => ScanHistory::load(&inputs.history_path)?.trend_points(),
    };

    let now = match &inputs.now {
        Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
            .with_context(|| format!("parse --now {raw}"))?,
        None => OffsetDateTime::now_utc(),
    };

    let report = TrendReport::build(&points, inputs.granularity, now, &inputs.thresholds);
    if inputs.json {
        println!("{}", render_json(&report));
    } else {
        println!("{}", report.human_summary());
    }
    Ok(())
}
