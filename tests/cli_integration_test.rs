#![cfg(feature = "sqlite")]
//! CLI tests driving `run` with real INI, CSV and SQLite files on disk.

mod common;

use clap::Parser;
use common::*;
use njord::adapters::file_config_adapter::FileConfigAdapter;
use njord::adapters::sqlite_adapter::SqliteAdapter;
use njord::cli::{self, Cli};
use njord::domain::candle::Candle;
use njord::domain::interval::Interval;
use njord::ports::data_port::CandleStore;
use njord::ports::model_port::ModelStore;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("njord.db");
        let config = dir.path().join("njord.ini");
        let content = format!("[sqlite]\npath = {}\n\n{}", db.display(), extra);
        std::fs::write(&config, content).unwrap();
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_arg(&self) -> String {
        self.config.display().to_string()
    }

    fn write_csv(&self, name: &str, candles: &[Candle]) -> PathBuf {
        let path = self.path().join(name);
        let mut out = String::from("date,open,high,low,close,volume\n");
        for c in candles {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                c.time.format("%Y-%m-%d"),
                c.open,
                c.high,
                c.low,
                c.close,
                c.volume
            ));
        }
        std::fs::write(&path, out).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> ExitCode {
        let mut argv = vec!["njord"];
        argv.extend_from_slice(args);
        cli::run(Cli::parse_from(argv))
    }

    fn database(&self) -> SqliteAdapter {
        let config = FileConfigAdapter::from_file(&self.config).unwrap();
        SqliteAdapter::from_config(&config).unwrap()
    }

    fn import(&self, symbol: &str, count: usize) {
        let file = self.write_csv(
            &format!("{symbol}_1day.csv"),
            &generate_candles(symbol, "2023-01-01", count, 100.0),
        );
        let file = file.display().to_string();
        assert_eq!(self.run(&["import", "-c", &self.config_arg(), &file]), ExitCode::SUCCESS);
    }
}

mod import {
    use super::*;

    #[test]
    fn import_infers_symbol_from_file_name() {
        let ws = Workspace::new("");
        ws.import("AAPL", 40);

        let db = ws.database();
        assert_eq!(db.list_symbols(Interval::DAILY).unwrap(), vec!["AAPL"]);
        let (_, _, count) = db.data_range("AAPL", Interval::DAILY).unwrap().unwrap();
        assert_eq!(count, 40);
    }

    #[test]
    fn reimport_does_not_duplicate() {
        let ws = Workspace::new("");
        ws.import("AAPL", 40);
        ws.import("AAPL", 45);

        let (_, _, count) = ws.database().data_range("AAPL", Interval::DAILY).unwrap().unwrap();
        assert_eq!(count, 45);
    }

    #[test]
    fn missing_csv_fails() {
        let ws = Workspace::new("");
        let code = ws.run(&["import", "-c", &ws.config_arg(), "/nonexistent/AAPL_1day.csv"]);
        assert_ne!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn missing_config_is_a_config_error() {
        let code = cli::run(Cli::parse_from(["njord", "list-symbols", "-c", "/nonexistent/njord.ini"]));
        assert_eq!(code, ExitCode::from(2));
    }
}

mod parse {
    use super::*;

    #[test]
    fn valid_expressions_succeed() {
        let code = cli::run(Cli::parse_from(["njord", "parse", "rsi(base=candles[close]); candles"]));
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn syntax_errors_map_to_expression_exit_code() {
        let code = cli::run(Cli::parse_from(["njord", "parse", "rsi(base=candles"]));
        assert_eq!(code, ExitCode::from(4));
    }
}

mod eval {
    use super::*;

    #[test]
    fn eval_writes_one_csv_per_symbol() {
        let ws = Workspace::new("");
        ws.import("AAPL", 60);
        ws.import("MSFT", 60);
        let out = ws.path().join("signals");

        let code = ws.run(&[
            "eval",
            "-c",
            &ws.config_arg(),
            "candles[close]; rsi<window=14>(base=candles[close])",
            "--symbols",
            "aapl,msft",
            "--start",
            "2023-01-01",
            "--end",
            "2023-12-31",
            "-o",
            &out.display().to_string(),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);

        let mut reader = csv::Reader::from_path(out.join("AAPL.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["time", "candles[close]", "rsi<window=14>(base=candles[close])"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 60);
        assert_eq!(&rows[0][2], "");
        assert!(!rows[59][2].is_empty());
        assert!(out.join("MSFT.csv").exists());
    }

    #[test]
    fn eval_rejects_unknown_signals() {
        let ws = Workspace::new("");
        ws.import("AAPL", 30);
        let code = ws.run(&[
            "eval",
            "-c",
            &ws.config_arg(),
            "nope(base=candles[close])",
            "--symbols",
            "AAPL",
            "--start",
            "2023-01-01",
            "--end",
            "2023-12-31",
        ]);
        assert_eq!(code, ExitCode::from(4));
    }
}

mod models {
    use super::*;

    const MODEL_INI: &str = "[model]
id = small
display_name = Small Model
symbols = AAPL,MSFT
start_date = 2023-01-01
end_date = 2023-12-31
features = rsi<window=14>(base=candles[close]) | ema<window=10>(base=candles[close])
label_window = 5
";

    #[test]
    fn train_then_predict_stores_predictions() {
        let ws = Workspace::new(MODEL_INI);
        ws.import("AAPL", 200);
        ws.import("MSFT", 200);

        assert_eq!(ws.run(&["train", "-c", &ws.config_arg()]), ExitCode::SUCCESS);
        let db = ws.database();
        let model = db.get_model("small").unwrap().unwrap();
        assert_eq!(model.display_name, "Small Model");
        assert_eq!(model.features.len(), 2);

        let code = ws.run(&["predict", "-c", &ws.config_arg(), "--date", "2023-07-31"]);
        assert_eq!(code, ExitCode::SUCCESS);

        let predictions = db
            .get_predictions(&njord::ports::model_port::PredictionQuery {
                symbols: None,
                range: full_range(),
                model_id: Some("small".into()),
            })
            .unwrap();
        assert_eq!(predictions.len(), 2);
        // 200 days from 2023-01-01 end on 2023-07-19.
        assert!(predictions.iter().all(|p| p.predict_from_date == njord::domain::interval::midnight(date(2023, 7, 19))));
    }

    #[test]
    fn predict_with_unknown_model_fails() {
        let ws = Workspace::new(MODEL_INI);
        ws.import("AAPL", 60);
        let code = ws.run(&["predict", "-c", &ws.config_arg(), "--model", "missing"]);
        assert_eq!(code, ExitCode::from(6));
    }
}

mod backtest {
    use super::*;

    #[test]
    fn random_backtest_writes_json_summary() {
        let ws = Workspace::new(
            "[backtest]
symbols = AAPL,MSFT,NONE
start_date = 2023-01-01
end_date = 2023-12-31
start_cash = 5000

[strategy]
kind = random
seed = 11
",
        );
        ws.import("AAPL", 100);
        ws.import("MSFT", 100);
        let out = ws.path().join("summary.json");

        let code = ws.run(&["backtest", "-c", &ws.config_arg(), "-o", &out.display().to_string()]);
        assert_eq!(code, ExitCode::SUCCESS);

        let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let results = summary["results"].as_object().unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(results["AAPL"]["bars"], 100);
        assert!(summary["average_gainloss"].is_number());
    }

    #[test]
    fn unknown_strategy_kind_is_a_config_error() {
        let ws = Workspace::new(
            "[backtest]
symbols = AAPL
start_date = 2023-01-01
end_date = 2023-12-31

[strategy]
kind = magic
",
        );
        ws.import("AAPL", 60);
        assert_eq!(ws.run(&["backtest", "-c", &ws.config_arg()]), ExitCode::from(2));
    }
}
