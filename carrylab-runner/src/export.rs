//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-day state table, rebalance log, warnings, and bond valuations
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use carrylab_core::{CouponEvent, PortfolioState, RebalanceEvent, SimulationWarning};

use crate::bond::BondDay;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Export the per-day state table.
///
/// Columns: date, price, trend, confirmed, cash, asset_units, asset_value,
/// total_value, allocation, coupon_received. Undefined confirmed signal and
/// allocation are written as empty cells.
pub fn export_states_csv(states: &[PortfolioState]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "price",
        "trend",
        "confirmed",
        "cash",
        "asset_units",
        "asset_value",
        "total_value",
        "allocation",
        "coupon_received",
    ])?;
    for s in states {
        wtr.write_record([
            s.date.to_string(),
            s.price.to_string(),
            s.trend_signal.to_string(),
            opt(s.confirmed_signal),
            s.cash.to_string(),
            s.asset_units.to_string(),
            s.asset_value.to_string(),
            s.total_value.to_string(),
            opt(s.allocation),
            s.coupon_received.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export the rebalance log.
///
/// Columns: date, price, from_allocation, to_allocation, cash_before,
/// units_before, cash_after, units_after, value_before, value_after.
pub fn export_rebalances_csv(rebalances: &[RebalanceEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "price",
        "from_allocation",
        "to_allocation",
        "cash_before",
        "units_before",
        "cash_after",
        "units_after",
        "value_before",
        "value_after",
    ])?;
    for r in rebalances {
        wtr.write_record([
            r.date.to_string(),
            r.price.to_string(),
            opt(r.from_allocation),
            r.to_allocation.to_string(),
            r.before.cash.to_string(),
            r.before.asset_units.to_string(),
            r.after.cash.to_string(),
            r.after.asset_units.to_string(),
            r.value_before.to_string(),
            r.value_after.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export warnings as `date, kind, message`.
pub fn export_warnings_csv(warnings: &[SimulationWarning]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "kind", "message"])?;
    for w in warnings {
        wtr.write_record([w.date().to_string(), w.kind().to_string(), w.to_string()])?;
    }
    finish(wtr)
}

/// Export daily bond valuations.
///
/// Columns: date, bond_price, bond_market_value, bond_pnl, combined_value.
pub fn export_bond_csv(days: &[BondDay]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "bond_price",
        "bond_market_value",
        "bond_pnl",
        "combined_value",
    ])?;
    for d in days {
        wtr.write_record([
            d.date.to_string(),
            d.price.to_string(),
            d.market_value.to_string(),
            d.pnl.to_string(),
            d.combined_value.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export coupon events as `date, amount`, readable by `load_coupon_csv`.
pub fn export_coupons_csv(coupons: &[CouponEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "amount"])?;
    for c in coupons {
        wtr.write_record([c.date.to_string(), c.amount.to_string()])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write manifest.json, states.csv, rebalances.csv, warnings.csv and
/// report.md (plus bond.csv when a bond leg was valued) into a new
/// timestamped directory under `output_dir`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        result.config_hash.short()
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let mut files = vec![
        ("manifest.json", export_json(result)?),
        ("states.csv", export_states_csv(&result.simulation.states)?),
        ("rebalances.csv", export_rebalances_csv(&result.simulation.rebalances)?),
        ("warnings.csv", export_warnings_csv(&result.simulation.warnings)?),
        ("report.md", generate_report(result)),
    ];
    if let Some(bond) = &result.bond {
        files.push(("bond.csv", export_bond_csv(&bond.days)?));
    }
    for (name, content) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn fraction(value: Option<f64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| format!("{:.0}%", v * 100.0))
}

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let s = &result.summary;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    match (s.first_date, s.last_date) {
        (Some(first), Some(last)) => md.push_str(&format!(
            "| Period | {first} to {last} ({} days) |\n",
            s.days_held
        )),
        _ => md.push_str("| Period | (no market days) |\n"),
    }
    md.push_str(&format!("| Trading Days | {} |\n", s.trading_days));
    md.push_str(&format!("| Initial Cash | ${:.2} |\n", s.initial_cash));
    md.push_str(&format!(
        "| Confirmation Window | {} |\n",
        result.config.confirmation_window
    ));
    md.push_str(&format!(
        "| Coupon Policy | {:?} |\n",
        result.config.coupon_policy
    ));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash.short()));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash.short()));
    if result.filled_cells > 0 {
        md.push_str(&format!("| Forward-filled Cells | {} |\n", result.filled_cells));
    }
    md.push('\n');

    // Allocation table
    md.push_str("## Allocation Table\n\n");
    md.push_str("| Confirmed Signal | Asset Fraction |\n");
    md.push_str("| --- | --- |\n");
    for rule in result.config.allocation.rules() {
        md.push_str(&format!(
            "| {:+.2} | {} |\n",
            rule.signal,
            fraction(Some(rule.fraction))
        ));
    }
    md.push('\n');

    // Performance
    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Coupons Received | ${:.2} |\n", s.total_coupons));
    md.push_str(&format!("| Coupon Payments | {} |\n", s.coupon_payments));
    md.push_str(&format!("| Average Coupon | ${:.2} |\n", s.average_coupon));
    md.push_str(&format!(
        "| Contributed Capital | ${:.2} |\n",
        s.contributed_capital
    ));
    md.push_str(&format!("| Final Value | ${:.2} |\n", s.final_value));
    md.push_str(&format!("| Total P&L | ${:.2} |\n", s.total_pnl));
    md.push_str(&format!("| Total Return | {} |\n", pct(s.total_return)));
    md.push_str(&format!(
        "| Annualized Return (simple) | {} |\n",
        pct(s.annualized_return)
    ));
    md.push_str(&format!(
        "| Time-weighted Return | {} |\n",
        pct(s.time_weighted_return)
    ));
    md.push_str(&format!("| Max Drawdown | {} |\n", pct(s.max_drawdown)));
    if let Some(best) = s.best_day {
        md.push_str(&format!("| Best Day | ${:.2} on {} |\n", best.pnl, best.date));
    }
    if let Some(worst) = s.worst_day {
        md.push_str(&format!("| Worst Day | ${:.2} on {} |\n", worst.pnl, worst.date));
    }
    md.push('\n');

    // Final position
    md.push_str("## Final Position\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Cash | ${:.2} |\n", s.final_cash));
    md.push_str(&format!("| Asset Units | {:.8} |\n", s.final_asset_units));
    md.push_str(&format!("| Allocation | {} |\n", fraction(s.final_allocation)));
    if let Some(avg) = s.average_buy_price {
        md.push_str(&format!("| Average Buy Price | ${avg:.2} |\n"));
    }
    md.push_str(&format!("| Rebalances | {} |\n", s.rebalance_count));
    md.push('\n');

    // Bond leg
    if let Some(bond) = &result.bond {
        let b = &bond.summary;
        md.push_str("## Bond Position\n\n");
        md.push_str("| Field | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Initial Investment | ${:.2} |\n", b.initial_investment));
        md.push_str(&format!(
            "| Purchase | {:.2}% of par on {} |\n",
            b.purchase_price, b.purchase_date
        ));
        md.push_str(&format!("| Nominal Owned | ${:.2} |\n", b.nominal_owned));
        md.push_str(&format!("| Current Price | {:.2}% of par |\n", b.final_price));
        md.push_str(&format!("| Market Value | ${:.2} |\n", b.market_value));
        md.push_str(&format!("| Bond P&L | ${:.2} ({}) |\n", b.pnl, pct(b.pnl_pct)));
        md.push('\n');

        md.push_str("## Combined Portfolio\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Bond Market Value | ${:.2} |\n", b.market_value));
        md.push_str(&format!("| Sleeve Value | ${:.2} |\n", s.final_value));
        md.push_str(&format!("| Total Value | ${:.2} |\n", b.combined_value));
        md.push_str(&format!(
            "| Total P&L | ${:.2} ({}) |\n",
            b.combined_pnl,
            pct(b.combined_return)
        ));
        md.push_str(&format!(
            "| Annualized Return (simple) | {} |\n",
            pct(b.combined_annualized_return)
        ));
        md.push('\n');
    }

    // Warnings
    if !result.simulation.warnings.is_empty() {
        md.push_str(&format!("## Warnings ({})\n\n", s.warning_count));
        for w in &result.simulation.warnings {
            md.push_str(&format!("- {w}\n"));
        }
        md.push('\n');
    }

    md
}
