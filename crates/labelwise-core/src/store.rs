use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::ScanId;
use crate::risk::RiskLevel;
use crate::types::ScanTrendPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub product_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scanned_at: OffsetDateTime,
    pub score: Option<u8>,
    pub risk_level: Option<RiskLevel>,
    pub committed: bool,
}

/// Local history of scored scans. New scans start uncommitted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScanHistory {
    pub records: Vec<ScanRecord>,
}

impl ScanHistory {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read scan history {}", path.display()))?;
        let history = serde_json::from_str(&contents).context("parse scan history JSON")?;
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create history dir {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("render scan history JSON")?;
        fs::write(path, contents)
            .with_context(|| format!("write scan history {}", path.display()))?;
        Ok(())
    }

    pub fn record(
        &mut self,
        product_name: Option<String>,
        score: Option<u8>,
        risk_level: Option<RiskLevel>,
        scanned_at: OffsetDateTime,
    ) -> ScanId {
        let id = ScanId::new();
        self.records.push(ScanRecord {
            id,
            product_name,
            scanned_at,
            score,
            risk_level,
            committed: false,
        });
        id
    }

    /// Opts a scan into trend statistics. Returns false for unknown ids.
    pub fn commit(&mut self, id: ScanId) -> bool {
        match self.records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.committed = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ScanId) -> Option<&ScanRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn trend_points(&self) -> Vec<ScanTrendPoint> {
        self.records
            .iter()
            .map(|record| ScanTrendPoint {
                score: record.score,
                timestamp: record.scanned_at,
                committed: record.committed,
            })
            .collect()
    }
}
