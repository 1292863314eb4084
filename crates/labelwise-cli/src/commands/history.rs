use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use labelwise_core::ids::ScanId;
use labelwise_core::store::ScanHistory;

pub fn commit(history_path: &Path, scan_id: ScanId) -> Result<()> {
    let mut history = ScanHistory::load(history_path)?;
    if !history.commit(scan_id) {
        bail!("No scan {scan_id} in {}", history_path.display());
    }
    history.save(history_path)?;
    info!(scan = %scan_id, "scan committed");
    println!("Scan {scan_id} now counts toward your trends.");
    Ok(())
}
