//! Reference Risk Database.
//!
//! An immutable, versioned table of known additives. It is built once,
//! validated, sorted into precedence order (high tier first, then declared
//! order) and indexed for substring matching. Hot replacement goes through
//! [`DatabaseHandle`], which swaps whole snapshots.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use labelwise_core::error::LabelwiseError;
use labelwise_core::risk::RiskTier;
use labelwise_core::types::normalize_name;

use crate::matcher::AliasIndex;

/// Table compiled into the binary.
pub const BUILTIN_TABLE: &str = include_str!("../data/additives.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    /// Regulatory code such as an E number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub tier: RiskTier,
    pub points: u8,
    pub category: String,
    /// Lower-cased synonyms, most specific first.
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSource {
    version: String,
    records: Vec<RiskRecord>,
}

/// Normalized comparison keys of one record.
#[derive(Debug, Clone)]
pub(crate) struct RecordKeys {
    pub(crate) name: String,
    pub(crate) alt_name: Option<String>,
    pub(crate) code: Option<String>,
    /// Everything the matcher looks for: name, alt name, code and aliases.
    pub(crate) matching: Vec<String>,
}

pub(crate) struct RecordMatch<'a> {
    pub(crate) record: &'a RiskRecord,
    pub(crate) keys: &'a RecordKeys,
}

#[derive(Debug)]
pub struct RiskDatabase {
    version: String,
    fingerprint: String,
    records: Vec<RiskRecord>,
    keys: Vec<RecordKeys>,
    index: AliasIndex,
}

impl RiskDatabase {
    pub fn builtin() -> Result<Self, LabelwiseError> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, LabelwiseError> {
        let source: DatabaseSource = toml::from_str(contents)
            .map_err(|err| LabelwiseError::InvalidDatabase(format!("parse table: {err}")))?;
        Self::build(source.version, source.records, fingerprint(contents.as_bytes()))
    }

    pub fn from_records(
        version: impl Into<String>,
        records: Vec<RiskRecord>,
    ) -> Result<Self, LabelwiseError> {
        let serialized = serde_json::to_vec(&records)
            .map_err(|err| LabelwiseError::InvalidDatabase(format!("serialize records: {err}")))?;
        Self::build(version.into(), records, fingerprint(&serialized))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read risk table {}", path.display()))?;
        let database = Self::from_toml_str(&contents)
            .with_context(|| format!("load risk table {}", path.display()))?;
        Ok(database)
    }

    fn build(
        version: String,
        records: Vec<RiskRecord>,
        fingerprint: String,
    ) -> Result<Self, LabelwiseError> {
        let mut seen_names = HashSet::new();
        let mut normalized = Vec::with_capacity(records.len());
        for record in records {
            let record = normalize_record(record)?;
            if !seen_names.insert(normalize_name(&record.name)) {
                return Err(LabelwiseError::InvalidDatabase(format!(
                    "duplicate record: {}",
                    record.name
                )));
            }
            normalized.push(record);
        }

        // Stable, so declared order is kept within a tier.
        normalized.sort_by_key(|record| record.tier);

        let keys: Vec<RecordKeys> = normalized.iter().map(record_keys).collect();
        let index = AliasIndex::build(keys.iter().enumerate().flat_map(|(slot, keys)| {
            keys.matching.iter().map(move |key| (slot, key.as_str()))
        }));

        info!(
            version = %version,
            records = normalized.len(),
            keys = index.key_count(),
            "risk database loaded"
        );

        Ok(Self {
            version,
            fingerprint,
            records: normalized,
            keys,
            index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Hex SHA-256 of the source the table was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Records in precedence order.
    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, name: &str) -> Option<&RiskRecord> {
        let wanted = normalize_name(name);
        self.records
            .iter()
            .zip(&self.keys)
            .find(|(_, keys)| keys.name == wanted)
            .map(|(record, _)| record)
    }

    pub fn tier_counts(&self) -> Vec<(RiskTier, usize)> {
        RiskTier::ALL
            .iter()
            .map(|tier| {
                let count = self.records.iter().filter(|r| r.tier == *tier).count();
                (*tier, count)
            })
            .collect()
    }

    pub(crate) fn matching_record(&self, normalized: &str) -> Option<RecordMatch<'_>> {
        let slot = self.index.first_match(normalized)?;
        Some(RecordMatch {
            record: &self.records[slot],
            keys: &self.keys[slot],
        })
    }
}

fn normalize_record(mut record: RiskRecord) -> Result<RiskRecord, LabelwiseError> {
    record.name = record.name.trim().to_string();
    if record.name.is_empty() {
        return Err(LabelwiseError::InvalidDatabase(
            "record with empty name".to_string(),
        ));
    }
    if !record.tier.point_range().contains(&record.points) {
        let range = record.tier.point_range();
        return Err(LabelwiseError::InvalidDatabase(format!(
            "{}: {} points outside {} tier range {}-{}",
            record.name,
            record.points,
            record.tier,
            range.start(),
            range.end()
        )));
    }

    record.alt_name = trimmed(record.alt_name);
    record.code = trimmed(record.code);

    let mut seen = HashSet::new();
    record.aliases = record
        .aliases
        .iter()
        .map(|alias| normalize_name(alias))
        .filter(|alias| !alias.is_empty() && seen.insert(alias.clone()))
        .collect();
    Ok(record)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn record_keys(record: &RiskRecord) -> RecordKeys {
    let name = normalize_name(&record.name);
    let alt_name = record.alt_name.as_deref().map(normalize_name);
    let code = record.code.as_deref().map(normalize_name);

    let mut matching = vec![name.clone()];
    matching.extend(alt_name.clone());
    matching.extend(code.clone());
    matching.extend(record.aliases.iter().cloned());

    RecordKeys {
        name,
        alt_name,
        code,
        matching,
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Shared, swappable reference to the current database snapshot.
#[derive(Debug)]
pub struct DatabaseHandle {
    current: RwLock<Arc<RiskDatabase>>,
}

impl DatabaseHandle {
    pub fn new(database: RiskDatabase) -> Self {
        Self {
            current: RwLock::new(Arc::new(database)),
        }
    }

    /// The snapshot in effect now. Callers keep it for a whole scoring pass.
    pub fn snapshot(&self) -> Arc<RiskDatabase> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Installs a new snapshot and returns the previous one. Passes already
    /// holding the old snapshot finish against it.
    pub fn replace(&self, database: RiskDatabase) -> Arc<RiskDatabase> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, tier: RiskTier, points: u8, aliases: &[&str]) -> RiskRecord {
        RiskRecord {
            name: name.to_string(),
            alt_name: None,
            code: None,
            tier,
            points,
            category: "test".to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn linear_match<'a>(database: &'a RiskDatabase, normalized: &str) -> Option<&'a str> {
        database
            .records
            .iter()
            .zip(&database.keys)
            .find(|(_, keys)| keys.matching.iter().any(|key| normalized.contains(key.as_str())))
            .map(|(record, _)| record.name.as_str())
    }

    #[test]
    fn test_builtin_table_loads() {
        let database = RiskDatabase::builtin().unwrap();
        assert!(!database.is_empty());
        assert_eq!(database.version(), "2024.06");
        assert_eq!(database.fingerprint().len(), 64);
        let nitrite = database.record("sodium nitrite").unwrap();
        assert_eq!(nitrite.tier, RiskTier::High);
        assert_eq!(nitrite.points, 30);
        assert_eq!(nitrite.code.as_deref(), Some("E250"));
    }

    #[test]
    fn test_records_sorted_by_tier() {
        let database = RiskDatabase::builtin().unwrap();
        let tiers: Vec<RiskTier> = database.records().iter().map(|r| r.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        let counts = database.tier_counts();
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), database.len());
    }

    #[test]
    fn test_declared_order_kept_within_tier() {
        let database = RiskDatabase::from_records(
            "t",
            vec![
                record("Low One", RiskTier::Low, 1, &[]),
                record("High One", RiskTier::High, 10, &[]),
                record("Low Two", RiskTier::Low, 2, &[]),
                record("High Two", RiskTier::High, 20, &[]),
            ],
        )
        .unwrap();
        let names: Vec<&str> = database.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["High One", "High Two", "Low One", "Low Two"]);
    }

    #[test]
    fn test_rejects_points_outside_tier_range() {
        let err = RiskDatabase::from_records(
            "t",
            vec![record("Overpriced", RiskTier::Medium, 12, &["overpriced"])],
        )
        .unwrap_err();
        assert!(matches!(err, LabelwiseError::InvalidDatabase(_)));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = RiskDatabase::from_records(
            "t",
            vec![
                record("Guar Gum", RiskTier::Low, 1, &[]),
                record("guar gum ", RiskTier::Low, 2, &[]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LabelwiseError::InvalidDatabase(_)));
    }

    #[test]
    fn test_aliases_normalized() {
        let database = RiskDatabase::from_records(
            "t",
            vec![record("Thing", RiskTier::Low, 1, &["  MIXED Case ", "", "mixed case"])],
        )
        .unwrap();
        assert_eq!(database.records()[0].aliases, vec!["mixed case".to_string()]);
    }

    #[test]
    fn test_index_agrees_with_linear_scan() {
        let database = RiskDatabase::builtin().unwrap();
        let names = [
            "sodium nitrite (e250)",
            "food-grade sodium nitrite preservative",
            "partially hydrogenated soybean oil",
            "sea salt",
            "colour: caramel colour (e150d)",
            "sweetener (aspartame, acesulfame k)",
            "味精",
            "modified corn starch",
            "natural flavouring, citric acid",
            "water",
            "",
            "ms",
        ];
        for name in names {
            let indexed = database.matching_record(name).map(|m| m.record.name.as_str());
            assert_eq!(indexed, linear_match(&database, name), "name: {name}");
        }
    }

    #[test]
    fn test_handle_swaps_snapshots() {
        let handle = DatabaseHandle::new(RiskDatabase::builtin().unwrap());
        let before = handle.snapshot();
        let replacement =
            RiskDatabase::from_records("next", vec![record("Only", RiskTier::Low, 1, &[])])
                .unwrap();
        let previous = handle.replace(replacement);
        assert_eq!(previous.version(), before.version());
        assert_eq!(handle.snapshot().version(), "next");
        assert_eq!(before.version(), "2024.06");
    }
}
