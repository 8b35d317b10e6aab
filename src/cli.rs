//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::momentum_strategy::MomentumStrategy;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, parse_instruments, validate_strategy_config,
};
use crate::domain::error::TicksimError;
use crate::domain::feed::MarketData;
use crate::domain::metrics::Metrics;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::strategy_port::StrategyPort;

#[derive(Parser, Debug)]
#[command(name = "ticksim", about = "Tick-driven trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for equity.csv and trades.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Restrict the run to one instrument
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for configured instrument(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: Option<String>,
    },
    /// List instruments with tick data under the configured data path
    ListInstruments {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            instrument,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_cmd(&config, output.as_ref(), instrument.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, instrument } => run_info(&config, instrument.as_deref()),
        Command::ListInstruments { config } => run_list_instruments(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TicksimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Resolve the concrete strategy from `[strategy] name`. Unknown names are
/// fatal; no silent fallback strategy exists.
pub fn build_strategy(config: &dyn ConfigPort) -> Result<Box<dyn StrategyPort>, TicksimError> {
    validate_strategy_config(config)?;
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match name.as_str() {
        "momentum" => Ok(Box::new(MomentumStrategy::from_config(config))),
        other => Err(TicksimError::ConfigInvalid {
            section: "strategy".into(),
            key: "name".into(),
            reason: format!("unknown strategy: {other}"),
        }),
    }
}

/// `--instrument` override wins over `[backtest] instruments`.
pub fn resolve_instruments(
    instrument_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, TicksimError> {
    match instrument_override {
        Some(instrument) => Ok(vec![instrument.to_string()]),
        None => parse_instruments(config),
    }
}

fn require_data_path(config: &dyn ConfigPort) -> Result<PathBuf, TicksimError> {
    config
        .get_string("backtest", "data_path")
        .map(PathBuf::from)
        .ok_or_else(|| TicksimError::ConfigMissing {
            section: "backtest".into(),
            key: "data_path".into(),
        })
}

/// Fetch every instrument's history into one [`MarketData`]. Instruments
/// that fail to load are skipped with a warning; a run with no data at all
/// is an error.
pub fn load_market_data(
    data_port: &dyn DataPort,
    instruments: &[String],
) -> Result<MarketData, TicksimError> {
    let mut data = MarketData::new();
    for instrument in instruments {
        let ticks = match data_port.fetch_ticks(instrument) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", instrument, e);
                continue;
            }
        };
        data.insert(instrument, ticks)?;
    }
    if data.is_empty() {
        return Err(TicksimError::Data {
            reason: "no instruments with tick data to backtest".into(),
        });
    }
    Ok(data)
}

/// Data loading plus the replay loop, split out so tests can drive it with
/// a mock data port.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    strategy: Box<dyn StrategyPort>,
    instruments: &[String],
) -> Result<BacktestResult, TicksimError> {
    let data = load_market_data(data_port, instruments)?;
    eprintln!(
        "Running backtest: {} instruments, {} ticks",
        data.instruments().count(),
        data.tick_count()
    );
    run_backtest(&data, config, strategy)
}

fn run_backtest_cmd(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    instrument_override: Option<&str>,
) -> ExitCode {
    // Stage 1: load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: validate and build the backtest parameters
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: resolve the strategy
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: resolve instruments and the data source
    let instruments = match resolve_instruments(instrument_override, &adapter) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_path = match require_data_path(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_port = CsvAdapter::new(data_path);

    // Stages 5-6: load data and replay
    let result = match run_backtest_pipeline(&data_port, &bt_config, strategy, &instruments) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 7: console summary to stderr
    let metrics = Metrics::compute(&result);
    eprintln!("\n=== Results ===");
    eprintln!("Starting Capital:  {:.2}", result.starting_capital);
    eprintln!("Final Capital:     {:.2}", result.final_capital);
    eprintln!("Total Return:      {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Trades Closed:     {} ({} won / {} lost / {} breakeven)",
        metrics.trades_closed, metrics.trades_won, metrics.trades_lost, metrics.trades_breakeven,
    );
    eprintln!("Win Rate:          {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Worst Trade:       {:.2}%", metrics.worst_trade_drawdown);
    eprintln!("Worst Streak:      {:.2}%", metrics.worst_streak_drawdown);
    if metrics.rejected_entries > 0 {
        eprintln!(
            "Rejected Entries:  {} (insufficient capital or capacity)",
            metrics.rejected_entries
        );
    }

    // Stage 8: export
    if let Some(output) = output_path {
        if let Err(e) = CsvReportAdapter::new().write(&result, output) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nResults written to: {}", output.display());
    }

    ExitCode::SUCCESS
}

fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = build_strategy(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let instruments = match resolve_instruments(None, &adapter) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("\nBacktest parameters:");
    eprintln!("  starting_capital:   {}", bt_config.starting_capital);
    eprintln!("  fee_fraction:       {}", bt_config.fee_fraction);
    eprintln!("  max_open_positions: {}", bt_config.max_open_positions);
    eprintln!("  roi_threshold:      {}%", bt_config.roi_threshold);
    eprintln!("  stoploss_threshold: {}%", bt_config.stoploss_threshold);
    eprintln!("  instruments:        {}", instruments.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = build_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = build_strategy(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn format_utc(time: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(time)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| time.to_string())
}

fn run_info(config_path: &PathBuf, instrument_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_path = match require_data_path(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_port = CsvAdapter::new(data_path);

    let instruments = match resolve_instruments(instrument_override, &adapter) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for instrument in &instruments {
        match data_port.fetch_ticks(instrument) {
            Ok(ticks) => {
                let first = ticks.first().map(|t| t.time).unwrap_or_default();
                let last = ticks.last().map(|t| t.time).unwrap_or_default();
                println!(
                    "{}: {} ticks, {} to {}",
                    instrument,
                    ticks.len(),
                    format_utc(first),
                    format_utc(last),
                );
            }
            Err(e) => eprintln!("{}: no data ({})", instrument, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_list_instruments(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_path = match require_data_path(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let instruments = match CsvAdapter::new(data_path).list_instruments() {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if instruments.is_empty() {
        eprintln!("No instruments found");
    } else {
        for instrument in &instruments {
            println!("{}", instrument);
        }
        eprintln!("{} instruments found", instruments.len());
    }
    ExitCode::SUCCESS
}
