//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{FomoRun, Outcome, TradeSummary, run_fomo};
use crate::domain::config::{PipelineConfig, check_target_column, validate_config};
use crate::domain::error::VixTriggerError;
use crate::domain::extremum::Evaluation;
use crate::domain::features::FeatureFrame;
use crate::domain::forecast::{Forecast, run_forecast};
use crate::domain::instrument::Instrument;
use crate::domain::predictor::RidgeWindowRegressor;
use crate::domain::series_store::SeriesStore;
use crate::domain::signal::Signal;
use crate::ports::series_port::SeriesPort;

#[derive(Parser, Debug)]
#[command(
    name = "vixtrigger",
    about = "VIX breakout signals, FOMO backtests and window forecasts"
)]
pub struct Cli {
    /// Log progress at info level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the breakout signal for the latest bar or a live price
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        lookback: Option<usize>,
        /// Live price to evaluate against the latest bar's open
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Replay signals over the configured range and pair them against a target's closes
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        lookback: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Train the window regressor and forecast the held-out rows
    Forecast {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        target_column: Option<String>,
        #[arg(long)]
        steps: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List known instruments and, with a config, which have price files
    Instruments {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Install the stderr log subscriber. Default level is `warn`, `info` with `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Signal {
            config,
            instrument,
            lookback,
            price,
            json,
        } => run_signal(&config, instrument.as_deref(), lookback, price, json),
        Command::Backtest {
            config,
            instrument,
            target,
            lookback,
            json,
        } => run_backtest(
            &config,
            instrument.as_deref(),
            target.as_deref(),
            lookback,
            json,
        ),
        Command::Forecast {
            config,
            target_column,
            steps,
            json,
        } => run_forecast_command(&config, target_column.as_deref(), steps, json),
        Command::Validate { config } => run_validate(&config),
        Command::Instruments { config } => run_instruments(config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<PipelineConfig, VixTriggerError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)
}

/// Command-line overrides for selected configuration keys.
#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub instrument: Option<&'a str>,
    pub target: Option<&'a str>,
    pub lookback: Option<usize>,
    pub steps: Option<usize>,
    pub target_column: Option<&'a str>,
}

pub fn apply_overrides(
    config: &mut PipelineConfig,
    overrides: &Overrides<'_>,
) -> Result<(), VixTriggerError> {
    if let Some(name) = overrides.instrument {
        config.signal.instrument = name.parse()?;
    }
    if let Some(name) = overrides.target {
        config.backtest.target_instrument = name.parse()?;
    }
    if let Some(lookback) = overrides.lookback {
        config.signal.lookback = lookback;
    }
    if let Some(steps) = overrides.steps {
        config.features.steps = steps;
    }
    if let Some(column) = overrides.target_column {
        check_target_column(column, &config.features.inputs)?;
        config.features.target_column = column.to_string();
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), VixTriggerError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

/// Load every instrument up to `end`, failing on the first one that could not be loaded.
fn load_store(
    port: &dyn SeriesPort,
    instruments: &[Instrument],
    end: NaiveDate,
    minimum_bars: usize,
) -> Result<SeriesStore, VixTriggerError> {
    let mut store = SeriesStore::new();
    let skipped = store.load(port, instruments, NaiveDate::MIN, end, minimum_bars);
    for s in &skipped {
        eprintln!("  {}: skipped ({})", s.instrument, s.reason);
    }
    match skipped.first() {
        Some(first) => Err(first.to_error()),
        None => Ok(store),
    }
}

/// API-style answer for one evaluation.
#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub instrument: Instrument,
    pub date: NaiveDate,
    pub price: f64,
    pub recommendation: Signal,
    pub new_high: bool,
    pub new_low: bool,
    pub up_today: bool,
}

impl Recommendation {
    pub fn new(instrument: Instrument, date: NaiveDate, price: f64, eval: &Evaluation) -> Self {
        Self {
            instrument,
            date,
            price,
            recommendation: eval.signal,
            new_high: eval.new_high,
            new_low: eval.new_low,
            up_today: eval.above_open,
        }
    }
}

fn run_signal(
    config_path: &Path,
    instrument: Option<&str>,
    lookback: Option<usize>,
    price: Option<f64>,
    json: bool,
) -> Result<(), VixTriggerError> {
    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        &Overrides {
            instrument,
            lookback,
            ..Overrides::default()
        },
    )?;
    let engine = config.signal_engine()?;
    let adapter = CsvSeriesAdapter::new(config.require_data_directory()?.clone());

    let instrument = config.signal.instrument;
    let series = adapter.fetch_series(instrument, NaiveDate::MIN, NaiveDate::MAX)?;
    let latest = *series.last().ok_or_else(|| VixTriggerError::NoData {
        instrument: instrument.to_string(),
    })?;

    let (eval, current) = match price {
        Some(p) => (engine.evaluate_live(&series, p)?, p),
        None => (engine.evaluate_at(&series, series.len() - 1)?, latest.close()),
    };
    let recommendation = Recommendation::new(instrument, latest.date(), current, &eval);

    if json {
        return print_json(&recommendation);
    }
    println!(
        "{} {} at {:.2}: {}",
        instrument, recommendation.date, current, recommendation.recommendation
    );
    eprintln!(
        "  new {}-day high: {}, new low: {}, up today: {}",
        engine.lookback(),
        eval.new_high,
        eval.new_low,
        eval.above_open
    );
    Ok(())
}

#[derive(Serialize)]
struct BacktestOutput<'a> {
    #[serde(flatten)]
    run: &'a FomoRun,
    total_profit: f64,
    summary: TradeSummary,
    outcome: Outcome,
}

fn run_backtest(
    config_path: &Path,
    instrument: Option<&str>,
    target: Option<&str>,
    lookback: Option<usize>,
    json: bool,
) -> Result<(), VixTriggerError> {
    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        &Overrides {
            instrument,
            target,
            lookback,
            ..Overrides::default()
        },
    )?;
    let engine = config.signal_engine()?;
    let adapter = CsvSeriesAdapter::new(config.require_data_directory()?.clone());

    let settings = &config.backtest;
    let instruments = [config.signal.instrument, settings.target_instrument];
    let store = load_store(&adapter, &instruments, settings.end_date, engine.lookback() + 1)?;
    let run = run_fomo(
        &store,
        config.signal.instrument,
        settings.target_instrument,
        &engine,
        settings.start_date,
        settings.end_date,
    )?;
    let report = &run.report;

    if json {
        return print_json(&BacktestOutput {
            run: &run,
            total_profit: report.total_profit(),
            summary: report.summary(),
            outcome: report.outcome(),
        });
    }

    eprintln!(
        "{} triggers on {} between {} and {} ({} days without full history)",
        run.signals.len(),
        run.signal_instrument,
        settings.start_date,
        settings.end_date,
        run.skipped_days
    );
    for trade in &report.trades {
        println!(
            "{} buy {:.2} -> {} sell {:.2}: {:+.2}",
            trade.buy_date, trade.buy_price, trade.sell_date, trade.sell_price, trade.profit
        );
    }
    for date in &report.gaps {
        eprintln!("  gap: no {} close on {}", run.target_instrument, date);
    }
    for date in &report.rejected_sells {
        eprintln!("  rejected sell on {date}: not after the open buy");
    }
    if let Some(open) = report.open_position {
        eprintln!("  still open: bought {:.2} on {}", open.price, open.date);
    }
    let summary = report.summary();
    eprintln!(
        "{} trades, {} won, {} lost, win rate {:.1}%",
        summary.trades,
        summary.wins,
        summary.losses,
        summary.win_rate * 100.0
    );
    println!("{report} on {}", run.target_instrument);
    Ok(())
}

fn run_forecast_command(
    config_path: &Path,
    target_column: Option<&str>,
    steps: Option<usize>,
    json: bool,
) -> Result<(), VixTriggerError> {
    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        &Overrides {
            steps,
            target_column,
            ..Overrides::default()
        },
    )?;
    let builder = config.feature_builder()?;
    let adapter = CsvSeriesAdapter::new(config.require_data_directory()?.clone());

    let features = &config.features;
    let store = load_store(
        &adapter,
        &features.inputs,
        config.backtest.end_date,
        builder.steps() + 1,
    )?;
    let series = features
        .inputs
        .iter()
        .map(|&i| store.require(i))
        .collect::<Result<Vec<_>, _>>()?;
    let frame = FeatureFrame::from_series(&series).fill_missing(0.0);
    let target = frame.column_index(&features.target_column)?;

    let mut model = RidgeWindowRegressor::new(features.ridge_alpha);
    let forecast = run_forecast(&frame, target, &builder, features.train_ratio, &mut model)?;

    if json {
        return print_json(&forecast);
    }
    print_forecast(&forecast);
    Ok(())
}

fn print_forecast(forecast: &Forecast) {
    eprintln!(
        "{}: trained on {} rows, train MSE {:.6}",
        forecast.target, forecast.train_rows, forecast.train_mse
    );
    println!("date,actual,predicted");
    for p in &forecast.points {
        println!("{},{:.4},{:.4}", p.date, p.actual, p.predicted);
    }
    eprintln!("mean absolute error: {:.4}", forecast.mean_absolute_error());
}

fn run_validate(config_path: &Path) -> Result<(), VixTriggerError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    config.signal_engine()?;
    config.feature_builder()?;

    let inputs: Vec<String> = config.features.inputs.iter().map(|i| i.to_string()).collect();
    eprintln!(
        "  signal: {} over {} days",
        config.signal.instrument, config.signal.lookback
    );
    eprintln!(
        "  features: [{}] target {} with {} steps",
        inputs.join(", "),
        config.features.target_column,
        config.features.steps
    );
    eprintln!(
        "  backtest: {} to {} against {}",
        config.backtest.start_date, config.backtest.end_date, config.backtest.target_instrument
    );
    eprintln!("Configuration is valid.");
    Ok(())
}

fn run_instruments(config_path: Option<&Path>) -> Result<(), VixTriggerError> {
    let available = match config_path {
        Some(path) => {
            let config = load_config(path)?;
            let adapter = CsvSeriesAdapter::new(config.require_data_directory()?.clone());
            Some(adapter.list_instruments()?)
        }
        None => None,
    };

    for instrument in Instrument::ALL {
        let marker = match &available {
            Some(held) if held.contains(&instrument) => " [data]",
            _ => "",
        };
        println!("{:<12} {}{}", instrument.name(), instrument.symbol(), marker);
    }
    Ok(())
}
