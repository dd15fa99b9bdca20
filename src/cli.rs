//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::domain::calendar::TradingCalendar;
use crate::domain::error::KilnError;
use crate::domain::strategy::{
    buy_and_hold_multi_asset, buy_and_hold_single_asset, ndays_rebalance_multi_asset,
    ndays_rebalance_single_asset, yearly_rebalance_multi_asset, yearly_rebalance_single_asset,
    Strategy,
};
use crate::domain::universe::{parse_symbols, AssetUniverse};

#[derive(Parser, Debug)]
#[command(name = "kiln", about = "Portfolio strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
pub enum RebalanceRule {
    /// Buy once, hold untouched
    BuyHold,
    /// Restore the target mix on each anniversary of the begin date
    Annual,
    /// Restore the target mix every N trading days
    Ndays,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over CSV price data
    Backtest {
        /// Directory of SYMBOL.csv files
        #[arg(long)]
        data_dir: PathBuf,
        /// Comma-separated symbols, e.g. SPY,LQD
        #[arg(long)]
        symbols: String,
        /// Comma-separated weights matching --symbols; equal if omitted
        #[arg(long)]
        weights: Option<String>,
        #[arg(long)]
        begin: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, value_enum, default_value_t = RebalanceRule::BuyHold)]
        rebalance: RebalanceRule,
        /// Rebalance interval in trading days, for --rebalance ndays
        #[arg(long, default_value_t = 10)]
        ndays: usize,
        /// First date the trading calendar covers
        #[arg(long, default_value = "2000-01-01")]
        history_start: NaiveDate,
    },
    /// List the trading days in a date range
    Calendar {
        #[arg(long)]
        begin: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// First date the trading calendar covers
        #[arg(long, default_value = "2000-01-01")]
        history_start: NaiveDate,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            data_dir,
            symbols,
            weights,
            begin,
            end,
            rebalance,
            ndays,
            history_start,
        } => run_backtest(
            &data_dir,
            &symbols,
            weights.as_deref(),
            begin,
            end,
            rebalance,
            ndays,
            history_start,
        ),
        Command::Calendar {
            begin,
            end,
            history_start,
        } => run_calendar(begin, end, history_start),
    }
}

fn fail(err: &KilnError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    data_dir: &PathBuf,
    symbols: &str,
    weights: Option<&str>,
    begin: NaiveDate,
    end: NaiveDate,
    rebalance: RebalanceRule,
    ndays: usize,
    history_start: NaiveDate,
) -> ExitCode {
    let symbols = match parse_symbols(symbols) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let weights = match resolve_weights(weights, symbols.len()) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };

    eprintln!("Building trading calendar from {history_start} to {end}");
    let calendar = match TradingCalendar::with_end(history_start, end) {
        Ok(c) => Arc::new(c),
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Loading {} symbol(s) from {}",
        symbols.len(),
        data_dir.display()
    );
    let adapter = CsvDataAdapter::new(data_dir.clone());
    let symbol_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let universe = match AssetUniverse::from_port(&adapter, &symbol_refs, calendar) {
        Ok(u) => u,
        Err(e) => return fail(&e),
    };

    let strategy = match build_strategy(&universe, &symbol_refs, &weights, begin, end, rebalance, ndays)
    {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("Running backtest from {begin} to {end}");
    let performance = match strategy.performance_during(begin, end) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let report = || -> Result<(), KilnError> {
        println!("period:        {} to {}", performance.begin(), performance.end());
        println!("trading days:  {}", performance.duration());
        println!("total return:  {:.4}%", performance.total_return()? * 100.0);
        println!("cagr:          {:.4}%", performance.cagr()? * 100.0);
        println!("volatility:    {:.4}%", performance.volatility()? * 100.0);
        println!("simple sharpe: {:.4}", performance.simple_sharpe()?);
        println!("trades:        {}", performance.number_of_trades()?);
        Ok(())
    };
    match report() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn build_strategy(
    universe: &AssetUniverse,
    symbols: &[&str],
    weights: &[f64],
    begin: NaiveDate,
    end: NaiveDate,
    rebalance: RebalanceRule,
    ndays: usize,
) -> Result<Strategy, KilnError> {
    if symbols.len() == 1 {
        let symbol = symbols[0];
        return match rebalance {
            RebalanceRule::BuyHold => buy_and_hold_single_asset(universe, begin, end, symbol),
            RebalanceRule::Annual => yearly_rebalance_single_asset(universe, symbol),
            RebalanceRule::Ndays => ndays_rebalance_single_asset(universe, symbol, ndays),
        };
    }
    match rebalance {
        RebalanceRule::BuyHold => buy_and_hold_multi_asset(universe, begin, end, symbols, weights),
        RebalanceRule::Annual => yearly_rebalance_multi_asset(universe, symbols, weights),
        RebalanceRule::Ndays => ndays_rebalance_multi_asset(universe, symbols, weights, ndays),
    }
}

/// Parses `--weights`, or spreads weight equally when it is omitted.
fn resolve_weights(input: Option<&str>, count: usize) -> Result<Vec<f64>, KilnError> {
    let Some(input) = input else {
        return Ok(vec![1.0 / count as f64; count]);
    };
    let mut weights = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        let weight: f64 = trimmed.parse().map_err(|_| {
            KilnError::validation(format!("bad weight {trimmed:?} in weight list"))
        })?;
        weights.push(weight);
    }
    if weights.len() != count {
        return Err(KilnError::validation(format!(
            "{count} symbols but {} weights",
            weights.len()
        )));
    }
    Ok(weights)
}

fn run_calendar(begin: NaiveDate, end: NaiveDate, history_start: NaiveDate) -> ExitCode {
    let calendar = match TradingCalendar::with_end(history_start, end) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if begin > end {
        return fail(&KilnError::validation(format!(
            "begin {begin} is after end {end}"
        )));
    }
    let mut count = 0;
    for day in trading_days_in_range(&calendar, begin, end) {
        println!("{day}");
        count += 1;
    }
    eprintln!("{count} trading day(s) between {begin} and {end}");
    ExitCode::SUCCESS
}

/// Trading days within [begin, end], never outside it. A range with no
/// trading day in it (a weekend, say) yields nothing.
pub fn trading_days_in_range(
    calendar: &TradingCalendar,
    begin: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = NaiveDate> + '_ {
    calendar
        .trading_days()
        .iter()
        .copied()
        .filter(move |&day| day >= begin && day <= end)
}
