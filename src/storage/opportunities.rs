//! Arbitrage opportunity storage

use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;
use crate::types::ArbitrageOpportunity;

/// Appends a dispatched opportunity to `opportunities_<date>.jsonl` under `dir`.
pub fn save_opportunity(dir: &Path, opp: &ArbitrageOpportunity) -> Result<()> {
    fs::create_dir_all(dir)?;
    let filename = dir.join(format!("opportunities_{}.jsonl", Utc::now().format("%Y-%m-%d")));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(opp)?)?;

    info!(
        opportunity_id = %opp.id,
        pair = %opp.token_pair,
        spread_pct = %opp.spread_pct.round_dp(4),
        net_profit = %opp.net_profit_estimate.round_dp(2),
        "Saved dispatched arbitrage opportunity"
    );

    Ok(())
}
