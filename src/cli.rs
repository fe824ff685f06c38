//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, read_csv_file};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, comprehensive_backtest};
use crate::domain::error::NjordError;
use crate::domain::evaluator::Evaluator;
use crate::domain::fetchers::register_store_fetchers;
use crate::domain::interval::{Interval, TimeRange, format_datetime, parse_datetime};
use crate::domain::model::{Model, TrainConfig, train_model};
use crate::domain::prediction::{DEFAULT_LOOKBACK_DAYS, predict_price_change};
use crate::domain::presets::{price_change_label, technical_features};
use crate::domain::registry::{FetchOptions, ParamKind, SignalRegistry};
use crate::domain::signal_expr::SignalExpr;
use crate::domain::signal_parser::{parse_expr_list, parse_expr_list_with};
use crate::domain::strategy::{RandomStrategy, SignalModelStrategy, Strategy};
use crate::domain::universe::{MIN_CANDLES, parse_symbols, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandleStore;
use crate::ports::model_port::ModelStore;

/// Separator for expression lists in INI values.
pub const CONFIG_LIST_SEPARATOR: char = '|';

#[derive(Parser, Debug)]
#[command(name = "njord", about = "Signal-expression research and backtesting toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import candles from CSV files into the database
    Import {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV files named SYMBOL_interval.csv or SYMBOL.csv
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Symbol for all files, overriding the file names
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value = "1day")]
        interval: String,
    },
    /// List stored symbols
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Show the stored data range per symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// List registered signals and their parameters
    Signals {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Canonicalize signal expressions (separated by ';')
    Parse { expr: String },
    /// Evaluate signal expressions (separated by ';') over stored data
    Eval {
        #[arg(short, long)]
        config: PathBuf,
        expr: String,
        #[arg(long)]
        symbols: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Write one CSV per symbol into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Train and store a model from the [model] section
    Train {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Predict with a stored model and store the predictions
    Predict {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        symbols: Option<String>,
        /// Predict from this date (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Backtest the [strategy] over the [backtest] universe
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
        /// Write the summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the HTTP API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Import {
            config,
            files,
            symbol,
            interval,
        } => run_import(&config, &files, symbol.as_deref(), &interval),
        Command::ListSymbols { config, interval } => run_list_symbols(&config, interval.as_deref()),
        Command::Info {
            config,
            symbol,
            interval,
        } => run_info(&config, symbol.as_deref(), interval.as_deref()),
        Command::Signals { config } => run_signals(config.as_deref()),
        Command::Parse { expr } => run_parse(&expr),
        Command::Eval {
            config,
            expr,
            symbols,
            start,
            end,
            output,
        } => run_eval(&config, &expr, &symbols, &start, &end, output.as_deref()),
        Command::Train { config } => run_train(&config),
        Command::Predict {
            config,
            model,
            symbols,
            date,
        } => run_predict(&config, model.as_deref(), symbols.as_deref(), date.as_deref()),
        Command::Backtest {
            config,
            symbols,
            output,
        } => run_backtest(&config, symbols.as_deref(), output.as_deref()),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NjordError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Candle and model stores named by the config. Candles come from
/// `[data] csv_dir` when set, otherwise from the SQLite database.
pub struct Stores {
    pub candles: Arc<dyn CandleStore>,
    pub models: Arc<dyn ModelStore>,
}

#[cfg(feature = "sqlite")]
pub fn open_database(
    config: &dyn ConfigPort,
) -> Result<Arc<crate::adapters::sqlite_adapter::SqliteAdapter>, NjordError> {
    let db = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
    db.initialize_schema()?;
    Ok(Arc::new(db))
}

#[cfg(feature = "sqlite")]
pub fn open_stores(config: &dyn ConfigPort) -> Result<Stores, NjordError> {
    let db = open_database(config)?;
    let candles: Arc<dyn CandleStore> = match config.get_string("data", "csv_dir") {
        Some(dir) => Arc::new(CsvAdapter::new(PathBuf::from(dir))),
        None => db.clone(),
    };
    Ok(Stores { candles, models: db })
}

#[cfg(not(feature = "sqlite"))]
pub fn open_stores(_config: &dyn ConfigPort) -> Result<Stores, NjordError> {
    Err(without_sqlite())
}

#[cfg(not(feature = "sqlite"))]
fn without_sqlite() -> NjordError {
    NjordError::Database {
        reason: "njord was built without the sqlite feature".into(),
    }
}

/// The standard signal library plus store-backed candle fetchers.
pub fn build_registry(store: Arc<dyn CandleStore>) -> Result<SignalRegistry, NjordError> {
    let mut registry = SignalRegistry::standard()?;
    register_store_fetchers(&mut registry, store)?;
    Ok(registry)
}

fn config_interval(config: &dyn ConfigPort, cli: Option<&str>) -> Result<Interval, NjordError> {
    let text = cli
        .map(String::from)
        .or_else(|| config.get_string("data", "interval"))
        .unwrap_or_else(|| "1day".to_string());
    Ok(Interval::parse(&text)?)
}

fn config_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, NjordError> {
    let text = config
        .get_string(section, key)
        .ok_or_else(|| NjordError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })?;
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| NjordError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

pub fn config_range(config: &dyn ConfigPort, section: &str) -> Result<TimeRange, NjordError> {
    let start = config_date(config, section, "start_date")?;
    let end = config_date(config, section, "end_date")?;
    if end < start {
        return Err(NjordError::ConfigInvalid {
            section: section.into(),
            key: "end_date".into(),
            reason: "end_date is before start_date".into(),
        });
    }
    Ok(TimeRange::from_dates(start, end))
}

/// Expressions from a `|`-separated config value, `None` when the key is absent.
pub fn config_exprs(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Vec<SignalExpr>>, NjordError> {
    config
        .get_string(section, key)
        .map(|value| parse_expr_list_with(&value, CONFIG_LIST_SEPARATOR).map_err(NjordError::from))
        .transpose()
}

fn config_symbols(
    config: &dyn ConfigPort,
    section: &str,
    cli: Option<&str>,
) -> Result<Vec<String>, NjordError> {
    let raw = cli
        .map(String::from)
        .or_else(|| config.get_string(section, "symbols"))
        .ok_or_else(|| NjordError::ConfigMissing {
            section: section.into(),
            key: "symbols".into(),
        })?;
    Ok(parse_symbols(&raw)?)
}

/// Features and labels for the `[section]`: explicit expression lists, or
/// the technical preset over `leaf` with a forward price-change label.
pub fn config_signals(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<(Vec<SignalExpr>, Vec<SignalExpr>), NjordError> {
    let leaf = config
        .get_string(section, "leaf")
        .unwrap_or_else(|| "candles".to_string());
    let label_window = config.get_int(section, "label_window", 7);

    let features = match config_exprs(config, section, "features")? {
        Some(features) => features,
        None => match config.get_string(section, "preset").as_deref() {
            Some("technical") => technical_features(&leaf),
            _ => {
                return Err(NjordError::ConfigMissing {
                    section: section.into(),
                    key: "features".into(),
                });
            }
        },
    };
    let labels = config_exprs(config, section, "labels")?
        .unwrap_or_else(|| vec![price_change_label(&leaf, label_window)]);
    Ok((features, labels))
}

fn import_symbol(path: &Path, fallback: Option<&str>) -> Result<String, NjordError> {
    if let Some(symbol) = fallback {
        return Ok(symbol.to_uppercase());
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.split('_').next())
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .ok_or_else(|| NjordError::Database {
            reason: format!("cannot infer symbol from {}", path.display()),
        })
}

#[cfg(feature = "sqlite")]
fn run_import(
    config_path: &Path,
    files: &[PathBuf],
    symbol: Option<&str>,
    interval: &str,
) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;
    let interval = Interval::parse(interval)?;

    let mut total = 0;
    for file in files {
        let symbol = import_symbol(file, symbol)?;
        let candles = read_csv_file(file, &symbol)?;
        let written = db.insert_candles(&candles, interval)?;
        info!(%symbol, file = %file.display(), read = candles.len(), written, "imported");
        total += written;
    }
    println!("{total} candles imported");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(
    _config_path: &Path,
    _files: &[PathBuf],
    _symbol: Option<&str>,
    _interval: &str,
) -> Result<(), NjordError> {
    Err(without_sqlite())
}

fn run_list_symbols(config_path: &Path, interval: Option<&str>) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let stores = open_stores(&config)?;
    let interval = config_interval(&config, interval)?;

    let symbols = stores.candles.list_symbols(interval)?;
    if symbols.is_empty() {
        warn!(%interval, "no symbols found");
    }
    for symbol in &symbols {
        println!("{symbol}");
    }
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>, interval: Option<&str>) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let stores = open_stores(&config)?;
    let interval = config_interval(&config, interval)?;

    let symbols = match symbol {
        Some(s) => vec![s.to_uppercase()],
        None => stores.candles.list_symbols(interval)?,
    };
    let latest = stores
        .candles
        .latest_prices(&symbols.iter().cloned().collect(), interval)?;

    println!("{:<10} {:<20} {:<20} {:>8} {:>12}", "symbol", "first", "last", "rows", "last close");
    for symbol in &symbols {
        match stores.candles.data_range(symbol, interval)? {
            Some((first, last, count)) => {
                let close = latest.get(symbol).map_or(f64::NAN, |(_, c)| *c);
                println!(
                    "{:<10} {:<20} {:<20} {:>8} {:>12.4}",
                    symbol,
                    format_datetime(first),
                    format_datetime(last),
                    count,
                    close
                );
            }
            None => println!("{symbol:<10} no data"),
        }
    }
    Ok(())
}

fn run_signals(config_path: Option<&Path>) -> Result<(), NjordError> {
    let registry = match config_path {
        Some(path) => {
            let config = load_config(path)?;
            build_registry(open_stores(&config)?.candles)?
        }
        None => SignalRegistry::standard()?,
    };

    for (id, is_fetcher, params) in registry.describe() {
        let params: Vec<String> = params
            .iter()
            .map(|p| match &p.kind {
                ParamKind::Signal => format!("{}: signal", p.name),
                _ => match p.default_literal() {
                    Some(default) => format!("{}={}", p.name, default),
                    None => p.name.to_string(),
                },
            })
            .collect();
        let kind = if is_fetcher { "fetch" } else { "compute" };
        println!("{id:<20} {kind:<8} {}", params.join(", "));
    }
    Ok(())
}

fn run_parse(input: &str) -> Result<(), NjordError> {
    let exprs = parse_expr_list(input).inspect_err(|e| {
        eprintln!("{}", e.display_with_context(input));
    })?;
    for expr in exprs {
        println!("{}\t{} nodes", expr.qualified_id(), expr.node_count());
    }
    Ok(())
}

fn run_eval(
    config_path: &Path,
    input: &str,
    symbols: &str,
    start: &str,
    end: &str,
    output: Option<&Path>,
) -> Result<(), NjordError> {
    let exprs = parse_expr_list(input).inspect_err(|e| {
        eprintln!("{}", e.display_with_context(input));
    })?;
    let config = load_config(config_path)?;
    let stores = open_stores(&config)?;
    let registry = build_registry(stores.candles)?;

    let symbols = parse_symbols(symbols)?;
    let range = TimeRange::new(parse_datetime(start)?, end_of_day(end)?);
    let options = FetchOptions::new(symbols.iter().map(String::as_str), range);
    let sets = Evaluator::new(&registry, options).fetch_signal_set(&exprs, &[])?;

    for (symbol, set) in &sets {
        for name in set.column_names() {
            let values = set.column(name).unwrap_or(&[]);
            let valid = values.iter().filter(|v| !v.is_nan()).count();
            let last = values.iter().rev().find(|v| !v.is_nan()).copied().unwrap_or(f64::NAN);
            println!("{symbol:<8} {name:<50} {valid:>6} valid  last={last:.6}");
        }

        if let Some(dir) = output {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("{symbol}.csv"));
            let mut writer = csv::Writer::from_path(&path).map_err(|e| NjordError::Database {
                reason: format!("failed to write {}: {e}", path.display()),
            })?;
            let names: Vec<&str> = set.column_names().collect();
            let mut header = vec!["time"];
            header.extend(&names);
            let csv_err = |e: csv::Error| NjordError::Database {
                reason: format!("CSV write error: {e}"),
            };
            writer.write_record(&header).map_err(csv_err)?;
            for (row, time) in set.index().iter().enumerate() {
                let mut record = vec![format_datetime(*time)];
                record.extend(names.iter().map(|n| {
                    set.column(n)
                        .and_then(|c| c.get(row))
                        .filter(|v| !v.is_nan())
                        .map_or_else(String::new, |v| v.to_string())
                }));
                writer.write_record(&record).map_err(csv_err)?;
            }
            writer.flush()?;
            info!(%symbol, path = %path.display(), "wrote signals");
        }
    }
    Ok(())
}

/// A bare date as an end bound covers the whole day.
fn end_of_day(input: &str) -> Result<NaiveDateTime, NjordError> {
    match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(TimeRange::from_dates(date, date).end),
        Err(_) => Ok(parse_datetime(input)?),
    }
}

pub fn build_train_config(config: &dyn ConfigPort) -> Result<TrainConfig, NjordError> {
    let id = config
        .get_string("model", "id")
        .ok_or_else(|| NjordError::ConfigMissing {
            section: "model".into(),
            key: "id".into(),
        })?;
    let (features, labels) = config_signals(config, "model")?;
    let validation_ratio = config.get_double("model", "validation_ratio", 0.2);
    if !(0.0..1.0).contains(&validation_ratio) {
        return Err(NjordError::ConfigInvalid {
            section: "model".into(),
            key: "validation_ratio".into(),
            reason: "must be in [0, 1)".into(),
        });
    }
    Ok(TrainConfig {
        display_name: config.get_string("model", "display_name").unwrap_or_else(|| id.clone()),
        id,
        features,
        labels,
        alpha: config.get_double("model", "alpha", 1.0),
        validation_ratio,
        seed: config.get_int("model", "seed", 42) as u64,
    })
}

fn run_train(config_path: &Path) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let train_config = build_train_config(&config)?;
    let symbols = config_symbols(&config, "model", None)?;
    let range = config_range(&config, "model")?;

    let stores = open_stores(&config)?;
    let registry = build_registry(stores.candles)?;
    let options = FetchOptions::new(symbols.iter().map(String::as_str), range);

    info!(model = %train_config.id, features = train_config.features.len(), symbols = symbols.len(), "training");
    let model = train_model(&registry, &options, &train_config)?;
    stores.models.save_model(&model)?;

    println!("model {} saved", model.id);
    if let Some(mse) = model.validation_mse {
        println!("validation mse: {mse:.6}");
    }
    Ok(())
}

fn load_model(models: &dyn ModelStore, id: &str) -> Result<Model, NjordError> {
    models.get_model(id)?.ok_or_else(|| NjordError::Model {
        reason: format!("no stored model '{id}'"),
    })
}

fn run_predict(
    config_path: &Path,
    model_id: Option<&str>,
    symbols: Option<&str>,
    date: Option<&str>,
) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let stores = open_stores(&config)?;
    let model_id = model_id
        .map(String::from)
        .or_else(|| config.get_string("model", "id"))
        .ok_or_else(|| NjordError::ConfigMissing {
            section: "model".into(),
            key: "id".into(),
        })?;
    let model = load_model(stores.models.as_ref(), &model_id)?;
    let symbols: BTreeSet<String> = config_symbols(&config, "model", symbols)?.into_iter().collect();
    let predict_from = match date {
        Some(d) => end_of_day(d)?,
        None => chrono::Utc::now().naive_utc(),
    };

    let registry = build_registry(stores.candles)?;
    let predictions =
        predict_price_change(&model, &registry, &symbols, predict_from, DEFAULT_LOOKBACK_DAYS)?;
    let saved = stores.models.save_predictions(&predictions)?;
    info!(model = %model.id, saved, "stored predictions");

    for p in &predictions {
        println!(
            "{:<8} {} {:>10.4}",
            p.symbol,
            format_datetime(p.predict_from_date),
            p.prediction
        );
    }
    Ok(())
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, NjordError> {
    let defaults = BacktestConfig::default();
    let train_test_ratio = config.get_double("backtest", "train_test_ratio", defaults.train_test_ratio);
    if !(0.0..1.0).contains(&train_test_ratio) {
        return Err(NjordError::ConfigInvalid {
            section: "backtest".into(),
            key: "train_test_ratio".into(),
            reason: "must be in [0, 1)".into(),
        });
    }
    let start_cash = config.get_double("backtest", "start_cash", defaults.start_cash);
    if start_cash <= 0.0 {
        return Err(NjordError::ConfigInvalid {
            section: "backtest".into(),
            key: "start_cash".into(),
            reason: "must be positive".into(),
        });
    }
    Ok(BacktestConfig {
        start_cash,
        train_test_ratio,
        threads: config.get_int("backtest", "threads", 0).max(0) as usize,
    })
}

pub type StrategyFactory = Box<dyn FnMut(&str) -> Result<Box<dyn Strategy>, NjordError>>;

/// Builds a fresh strategy per symbol from the `[strategy]` section.
pub fn strategy_factory(
    config: &dyn ConfigPort,
    models: &dyn ModelStore,
) -> Result<StrategyFactory, NjordError> {
    let kind = config
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "technical".to_string());
    let leaf = config
        .get_string("strategy", "leaf")
        .unwrap_or_else(|| "candles".to_string());
    let alpha = config.get_double("strategy", "alpha", 1.0);
    let bias = config.get_double("strategy", "bias", 0.0);
    let label_window = config.get_int("strategy", "label_window", 7);
    let registry = SignalRegistry::standard()?;

    let template: Option<SignalModelStrategy> = match kind.as_str() {
        "random" => None,
        "technical" => Some(SignalModelStrategy::technical(registry, leaf, label_window, alpha)),
        "model" => {
            let features = config_exprs(config, "strategy", "features")?.ok_or_else(|| {
                NjordError::ConfigMissing {
                    section: "strategy".into(),
                    key: "features".into(),
                }
            })?;
            Some(SignalModelStrategy::new(registry, leaf, features, label_window, alpha))
        }
        "pretrained" => {
            let id = config
                .get_string("strategy", "model_id")
                .ok_or_else(|| NjordError::ConfigMissing {
                    section: "strategy".into(),
                    key: "model_id".into(),
                })?;
            Some(SignalModelStrategy::from_model(registry, leaf, &load_model(models, &id)?))
        }
        other => {
            return Err(NjordError::ConfigInvalid {
                section: "strategy".into(),
                key: "kind".into(),
                reason: format!("unknown strategy kind '{other}'"),
            });
        }
    };

    let template = template.map(|s| {
        let cutoff = config.get_double("strategy", "cutoff", s.cutoff);
        s.with_thresholds(cutoff, bias)
    });
    let mut random = RandomStrategy::new(config.get_int("strategy", "seed", 0) as u64);
    random.cutoff = config.get_double("strategy", "cutoff", RandomStrategy::DEFAULT_CUTOFF);

    Ok(Box::new(move |_symbol: &str| -> Result<Box<dyn Strategy>, NjordError> {
        let strategy: Box<dyn Strategy> = match &template {
            Some(s) => Box::new(s.clone()),
            None => Box::new(random),
        };
        Ok(strategy)
    }))
}

fn run_backtest(config_path: &Path, symbols: Option<&str>, output: Option<&Path>) -> Result<(), NjordError> {
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config)?;
    let symbols = config_symbols(&config, "backtest", symbols)?;
    let range = config_range(&config, "backtest")?;
    let interval = config_interval(&config, None)?;

    let stores = open_stores(&config)?;
    let factory = strategy_factory(&config, stores.models.as_ref())?;

    let validation = validate_universe(stores.candles.as_ref(), symbols, &range, interval, MIN_CANDLES)?;
    info!(
        symbols = validation.universe.count(),
        skipped = validation.skipped.len(),
        start = %format_datetime(range.start),
        end = %format_datetime(range.end),
        "running backtest"
    );

    let summary = comprehensive_backtest(
        factory,
        stores.candles.as_ref(),
        &validation.universe.symbols,
        &range,
        interval,
        &bt_config,
    );

    println!(
        "{:<8} {:>8} {:>12} {:>12} {:>10}",
        "symbol", "actions", "price chg %", "gain/loss %", "roi %"
    );
    for (symbol, r) in &summary.results {
        println!(
            "{:<8} {:>8} {:>12.2} {:>12.2} {:>10.2}",
            symbol,
            r.actions,
            r.price_change,
            r.gain_loss,
            r.final_snapshot.map_or(0.0, |s| s.roi * 100.0)
        );
    }
    println!("average gain/loss: {:.2}", summary.average_gainloss);

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        info!(path = %path.display(), "wrote summary");
    }
    Ok(())
}

#[cfg(feature = "web")]
fn run_serve(config_path: &Path) -> Result<(), NjordError> {
    use crate::adapters::web::{AppState, serve};

    let config = load_config(config_path)?;
    let stores = open_stores(&config)?;
    let listen = config
        .get_string("web", "listen")
        .unwrap_or_else(|| "127.0.0.1:5000".to_string());
    let static_dir = config.get_string("web", "static_dir").map(PathBuf::from);
    let state = AppState {
        candles: stores.candles,
        models: stores.models,
        interval: Interval::DAILY,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(state, &listen, static_dir))
}

#[cfg(not(feature = "web"))]
fn run_serve(_config_path: &Path) -> Result<(), NjordError> {
    Err(NjordError::ConfigInvalid {
        section: "web".into(),
        key: "listen".into(),
        reason: "njord was built without the web feature".into(),
    })
}
