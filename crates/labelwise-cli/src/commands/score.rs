use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use labelwise_core::config::Config;
use labelwise_core::store::ScanHistory;
use labelwise_core::types::ScanInput;
use reporting::json::render_json;
use reporting::ScoreReport;
use risk_engine::ScoringEngine;

#[derive(Debug)]
pub struct ScoreInputs {
    pub config: Config,
    pub history_path: PathBuf,
    pub input: PathBuf,
    pub json: bool,
    pub save: bool,
    pub commit: bool,
}

pub fn execute(inputs: ScoreInputs) -> Result<()> {
    let contents = fs::read_to_string(&inputs.input)
        .with_context(|| format!("read scan {}", inputs.input.display()))?;
    let scan = ScanInput::from_json(&contents)
        .with_context(|| format!("parse scan {}", inputs.input.display()))?;

    let engine = ScoringEngine::load(inputs.config)?;
    let score = engine.score(&scan)?;
    let scored_at = OffsetDateTime::now_utc();
    let mut report = ScoreReport::new(
        scan.product_name.clone(),
        engine.database().version(),
        score,
        scored_at,
    );

    if inputs.save {
        let mut history = ScanHistory::load(&inputs.history_path)?;
        let id = history.record(
            scan.product_name.clone(),
            Some(report.score.score),
            Some(report.score.risk_level),
            scored_at,
        );
        if inputs.commit {
            history.commit(id);
        }
        history.save(&inputs.history_path)?;
        report.scan_id = Some(id);
    }

    if inputs.json {
        println!("{}", render_json(&report));
    } else {
        println!("{}", report.human_summary());
    }
    Ok(())
}
