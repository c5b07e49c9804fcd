//! CarryLab CLI: run, schedule, and validate commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and/or CSV paths
//! - `schedule`: print a generated coupon schedule as CSV
//! - `validate`: load inputs and check them against the simulation's preconditions

mod logging;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use carrylab_core::{validate_inputs, CouponPolicy};
use carrylab_runner::export::{export_coupons_csv, save_artifacts};
use carrylab_runner::{
    load_bond_prices, load_inputs, run_from_config, BacktestResult, CarryConfig, CouponSchedule,
};

use logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "carrylab",
    about = "CarryLab CLI: coupon reinvestment trend backtester"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Data-source flags shared by `run` and `validate`.
#[derive(clap::Args)]
struct InputArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Market CSV (overrides [data].market_csv).
    #[arg(long)]
    market: Option<PathBuf>,

    /// Coupon CSV (overrides [data].coupon_csv).
    #[arg(long)]
    coupons: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest.
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Starting cash (overrides [simulation].initial_cash).
        #[arg(long)]
        initial_cash: Option<f64>,

        /// Confirmation window in days (overrides [simulation].confirmation_window).
        #[arg(long)]
        window: Option<usize>,

        /// First simulated date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Last simulated date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Apply coupons on non-trading days on the next market day instead of dropping them.
        #[arg(long, default_value_t = false)]
        carry_forward: bool,

        /// Output directory for artifacts (overrides [output].dir).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,

        /// Print the summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a fixed-interval coupon schedule as CSV.
    Schedule {
        /// Date of the first coupon (YYYY-MM-DD).
        #[arg(long)]
        first_date: String,

        /// Months between coupons.
        #[arg(long, default_value_t = 6)]
        interval_months: u32,

        /// Number of coupons.
        #[arg(long)]
        count: u32,

        /// Cash amount per coupon.
        #[arg(long, conflicts_with_all = ["nominal", "rate"])]
        amount: Option<f64>,

        /// Bond nominal (with --rate).
        #[arg(long, requires = "rate")]
        nominal: Option<f64>,

        /// Annual coupon rate as a fraction, e.g. 0.05125 (with --nominal).
        #[arg(long, requires = "nominal")]
        rate: Option<f64>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load inputs and check them without simulating.
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Run {
            input,
            initial_cash,
            window,
            start,
            end,
            carry_forward,
            output_dir,
            no_artifacts,
            json,
        } => {
            let mut config = load_config(&input)?;
            let sim = &mut config.simulation;
            if let Some(cash) = initial_cash {
                sim.initial_cash = cash;
            }
            if let Some(w) = window {
                sim.confirmation_window = w;
            }
            if let Some(s) = start.as_deref() {
                sim.start_date = Some(parse_date(s, "--start")?);
            }
            if let Some(e) = end.as_deref() {
                sim.end_date = Some(parse_date(e, "--end")?);
            }
            if carry_forward {
                sim.coupon_policy = CouponPolicy::CarryForward;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            run_backtest_cmd(&config, no_artifacts, json)
        }
        Commands::Schedule {
            first_date,
            interval_months,
            count,
            amount,
            nominal,
            rate,
            output,
        } => {
            let first_date = parse_date(&first_date, "--first-date")?;
            let schedule = match (amount, nominal, rate) {
                (Some(amount), _, _) => {
                    CouponSchedule::fixed(first_date, interval_months, count, amount)
                }
                (None, Some(nominal), Some(rate)) => {
                    CouponSchedule::from_bond(first_date, interval_months, count, nominal, rate)
                }
                _ => bail!("one of --amount or --nominal with --rate is required"),
            };
            run_schedule(&schedule, output)
        }
        Commands::Validate { input } => run_validate(&load_config(&input)?),
    }
}

/// Config file (or defaults) with CLI path overrides applied.
fn load_config(input: &InputArgs) -> Result<CarryConfig> {
    let mut config = match &input.config {
        Some(path) => CarryConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CarryConfig::default(),
    };
    if let Some(market) = &input.market {
        config.data.market_csv = Some(market.clone());
    }
    if let Some(coupons) = &input.coupons {
        config.data.coupon_csv = Some(coupons.clone());
    }
    Ok(config)
}

fn parse_date(s: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("{flag}: expected YYYY-MM-DD, got '{s}'"))
}

fn run_backtest_cmd(config: &CarryConfig, no_artifacts: bool, json: bool) -> Result<()> {
    tracing::debug!(?config, "resolved configuration");
    let result = run_from_config(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else {
        print_summary(&result);
    }

    if !no_artifacts {
        let run_dir = save_artifacts(&result, &config.output.dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_schedule(schedule: &CouponSchedule, output: Option<PathBuf>) -> Result<()> {
    let coupons = schedule.generate()?;
    let csv = export_coupons_csv(&coupons)?;
    match output {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {} coupons to {}", coupons.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_validate(config: &CarryConfig) -> Result<()> {
    let sim = config.to_simulation_config()?;
    let inputs = load_inputs(&config.data, config.coupon_schedule.as_ref())?;
    validate_inputs(&inputs.market, &inputs.coupons, &sim)?;
    let bond_quotes = match &config.bond {
        Some(bond) => Some(load_bond_prices(bond)?.len()),
        None => None,
    };

    let in_range = inputs.market.iter().filter(|d| sim.in_range(d.date)).count();
    println!("Market days:     {} ({in_range} in range)", inputs.market.len());
    if let (Some(first), Some(last)) = (inputs.market.first(), inputs.market.last()) {
        println!("Span:            {} to {}", first.date, last.date);
    }
    println!("Filled cells:    {}", inputs.filled_cells);
    println!("Coupons:         {}", inputs.coupons.len());
    println!("Allocation rows: {}", sim.allocation.len());
    if let Some(quotes) = bond_quotes {
        println!("Bond quotes:     {quotes}");
    }
    println!("OK");
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    match (s.first_date, s.last_date) {
        (Some(first), Some(last)) => {
            println!("Period:         {first} to {last} ({} days)", s.days_held)
        }
        _ => println!("Period:         (no market days)"),
    }
    println!("Trading Days:   {}", s.trading_days);
    println!("Window:         {}", result.config.confirmation_window);
    println!("Config Hash:    {}", result.config_hash.short());
    println!("Dataset Hash:   {}", result.dataset_hash.short());
    println!();
    println!("--- Performance ---");
    println!("Contributed:    ${:.2}", s.contributed_capital);
    println!("  of coupons:   ${:.2}", s.total_coupons);
    println!("Final Value:    ${:.2}", s.final_value);
    println!("Total P&L:      ${:.2}", s.total_pnl);
    println!("Total Return:   {:.2}%", s.total_return * 100.0);
    println!("Annualized:     {:.2}%", s.annualized_return * 100.0);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown * 100.0);
    if let Some(best) = s.best_day {
        println!("Best Day:       ${:.2} on {}", best.pnl, best.date);
    }
    if let Some(worst) = s.worst_day {
        println!("Worst Day:      ${:.2} on {}", worst.pnl, worst.date);
    }
    println!();
    println!("--- Final Position ---");
    println!("Cash:           ${:.2}", s.final_cash);
    println!("Asset Units:    {:.8}", s.final_asset_units);
    match s.final_allocation {
        Some(a) => println!("Allocation:     {:.0}%", a * 100.0),
        None => println!("Allocation:     none"),
    }
    if let Some(avg) = s.average_buy_price {
        println!("Avg Buy Price:  ${avg:.2}");
    }
    println!("Rebalances:     {}", s.rebalance_count);
    println!();
    println!("--- Coupon Income ---");
    println!("Payments:       {}", s.coupon_payments);
    println!("Total:          ${:.2}", s.total_coupons);
    println!("Average:        ${:.2}", s.average_coupon);
    if let Some(bond) = &result.bond {
        let b = &bond.summary;
        println!();
        println!("--- Bond Position ---");
        println!("Investment:     ${:.2}", b.initial_investment);
        println!("Purchase:       {:.2}% of par on {}", b.purchase_price, b.purchase_date);
        println!("Nominal Owned:  ${:.2}", b.nominal_owned);
        println!("Current Price:  {:.2}% of par", b.final_price);
        println!("Market Value:   ${:.2}", b.market_value);
        println!("Bond P&L:       ${:.2} ({:.2}%)", b.pnl, b.pnl_pct * 100.0);
        println!();
        println!("--- Combined Portfolio ---");
        println!("Total Value:    ${:.2}", b.combined_value);
        println!("Total P&L:      ${:.2}", b.combined_pnl);
        println!("Total Return:   {:.2}%", b.combined_return * 100.0);
        println!("Annualized:     {:.2}%", b.combined_annualized_return * 100.0);
    }
    if !result.simulation.warnings.is_empty() {
        println!();
        for warn in &result.simulation.warnings {
            println!("WARNING: {warn}");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_override_config() {
        let cli = Cli::parse_from([
            "carrylab", "run", "--market", "m.csv", "--window", "5", "--carry-forward",
        ]);
        let Commands::Run { input, window, carry_forward, .. } = cli.command else {
            panic!("expected run");
        };
        let config = load_config(&input).unwrap();
        assert_eq!(config.data.market_csv, Some(PathBuf::from("m.csv")));
        assert_eq!(window, Some(5));
        assert!(carry_forward);
    }

    #[test]
    fn schedule_amount_conflicts_with_bond_terms() {
        let parsed = Cli::try_parse_from([
            "carrylab", "schedule", "--first-date", "2021-07-15", "--count", "2",
            "--amount", "10", "--nominal", "1000", "--rate", "0.05",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_rejects_negative_initial_cash() {
        let dir = tempfile::tempdir().unwrap();
        let market = dir.path().join("market.csv");
        std::fs::write(
            &market,
            "date,price,trend\n2024-01-01,100,1\n2024-01-02,101,1\n2024-01-03,102,0\n",
        )
        .unwrap();
        let toml = dir.path().join("carry.toml");
        std::fs::write(
            &toml,
            "[simulation]\ninitial_cash = -5.0\n\n[data]\nmarket_csv = \"market.csv\"\n",
        )
        .unwrap();

        let config = CarryConfig::from_file(&toml).unwrap();
        let err = run_validate(&config).unwrap_err();
        assert!(err.to_string().contains("initial cash"), "{err:#}");
    }

    #[test]
    fn bad_date_names_the_flag() {
        let err = parse_date("15/07/2021", "--start").unwrap_err();
        assert!(err.to_string().contains("--start"));
    }
}
