//! SQLite storage adapter for candles, models and predictions.

use crate::domain::candle::Candle;
use crate::domain::error::NjordError;
use crate::domain::interval::{Interval, TimeRange, format_datetime};
use crate::domain::model::Model;
use crate::domain::prediction::Prediction;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandleStore;
use crate::ports::model_port::{ModelStore, ModelSummary, PredictionQuery};
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params, params_from_iter};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_time(text: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&text, TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(text.len(), rusqlite::types::Type::Text, Box::new(e))
    })
}

fn query_error(e: rusqlite::Error) -> NjordError {
    NjordError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NjordError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| NjordError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| NjordError::Database {
                    reason: e.to_string(),
                })?;

        debug!(path = %db_path, pool_size, "opened sqlite database");
        Ok(Self { pool })
    }

    /// Single-connection in-memory database.
    pub fn in_memory() -> Result<Self, NjordError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| NjordError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, NjordError> {
        self.pool.get().map_err(|e: r2d2::Error| NjordError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), NjordError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                interval TEXT NOT NULL,
                time TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (symbol, interval, time)
            );
            CREATE INDEX IF NOT EXISTS idx_candles_time ON candles(interval, time);
            CREATE TABLE IF NOT EXISTS models (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                created TEXT NOT NULL,
                model_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS predictions (
                model_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                predict_from_date TEXT NOT NULL,
                created_date TEXT NOT NULL,
                prediction REAL NOT NULL,
                PRIMARY KEY (model_id, symbol, predict_from_date)
            );
            CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(predict_from_date);",
        )
        .map_err(query_error)?;

        Ok(())
    }
}

impl CandleStore for SqliteAdapter {
    fn fetch_candles(
        &self,
        symbols: &BTreeSet<String>,
        range: &TimeRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, NjordError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;

        let query = format!(
            "SELECT symbol, time, open, high, low, close, volume
             FROM candles
             WHERE interval = ? AND time >= ? AND time <= ? AND symbol IN ({})
             ORDER BY symbol ASC, time ASC",
            placeholders(symbols.len())
        );
        let mut values = vec![
            interval.label(),
            format_datetime(range.start),
            format_datetime(range.end),
        ];
        values.extend(symbols.iter().cloned());

        let mut stmt = conn.prepare(&query).map_err(query_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Candle {
                    symbol: row.get(0)?,
                    time: parse_time(row.get(1)?)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn insert_candles(&self, candles: &[Candle], interval: Interval) -> Result<usize, NjordError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        let mut written = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO candles (symbol, interval, time, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_error)?;
            let label = interval.label();
            for candle in candles {
                written += stmt
                    .execute(params![
                        candle.symbol,
                        label,
                        format_datetime(candle.time),
                        candle.open,
                        candle.high,
                        candle.low,
                        candle.close,
                        candle.volume
                    ])
                    .map_err(query_error)?;
            }
        }

        tx.commit().map_err(query_error)?;
        debug!(rows = written, offered = candles.len(), %interval, "inserted candles");
        Ok(written)
    }

    fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
        interval: Interval,
    ) -> Result<BTreeMap<String, (NaiveDateTime, f64)>, NjordError> {
        if symbols.is_empty() {
            return Ok(BTreeMap::new());
        }
        let conn = self.conn()?;

        let query = format!(
            "SELECT c.symbol, c.time, c.close
             FROM candles c
             JOIN (SELECT symbol, MAX(time) AS time FROM candles
                   WHERE interval = ?1 GROUP BY symbol) latest
               ON c.symbol = latest.symbol AND c.time = latest.time
             WHERE c.interval = ?1 AND c.symbol IN ({})",
            placeholders(symbols.len())
        );
        let mut values = vec![interval.label()];
        values.extend(symbols.iter().cloned());

        let mut stmt = conn.prepare(&query).map_err(query_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, (parse_time(row.get(1)?)?, row.get::<_, f64>(2)?)))
            })
            .map_err(query_error)?;

        rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(query_error)
    }

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, NjordError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM candles WHERE interval = ?1 ORDER BY symbol")
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![interval.label()], |row| row.get(0))
            .map_err(query_error)?;

        rows.collect::<Result<Vec<String>, _>>().map_err(query_error)
    }

    fn data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, NjordError> {
        let conn = self.conn()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(time), MAX(time), COUNT(*) FROM candles WHERE symbol = ?1 AND interval = ?2",
                params![symbol, interval.label()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => Ok(Some((
                parse_time(min).map_err(query_error)?,
                parse_time(max).map_err(query_error)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }

    fn delete_candles(&self, symbol: &str, interval: Interval) -> Result<usize, NjordError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM candles WHERE symbol = ?1 AND interval = ?2",
            params![symbol, interval.label()],
        )
        .map_err(query_error)
    }
}

impl ModelStore for SqliteAdapter {
    fn save_model(&self, model: &Model) -> Result<(), NjordError> {
        let json = model.to_json()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO models (id, display_name, created, model_json) VALUES (?1, ?2, ?3, ?4)",
            params![model.id, model.display_name, format_datetime(model.created), json],
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn get_model(&self, id: &str) -> Result<Option<Model>, NjordError> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT model_json FROM models WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        json.map(|j| Model::from_json(&j)).transpose()
    }

    fn list_models(&self) -> Result<Vec<ModelSummary>, NjordError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, display_name, created FROM models ORDER BY created DESC, id")
            .map_err(query_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ModelSummary {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    created: parse_time(row.get(2)?)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn save_predictions(&self, predictions: &[Prediction]) -> Result<usize, NjordError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        let mut written = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO predictions
                     (model_id, symbol, predict_from_date, created_date, prediction)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(query_error)?;
            for p in predictions {
                written += stmt
                    .execute(params![
                        p.model_id,
                        p.symbol,
                        format_datetime(p.predict_from_date),
                        format_datetime(p.created_date),
                        p.prediction
                    ])
                    .map_err(query_error)?;
            }
        }
        tx.commit().map_err(query_error)?;
        Ok(written)
    }

    fn get_predictions(&self, query: &PredictionQuery) -> Result<Vec<Prediction>, NjordError> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT model_id, symbol, predict_from_date, created_date, prediction
             FROM predictions
             WHERE predict_from_date >= ? AND predict_from_date <= ?",
        );
        let mut values = vec![format_datetime(query.range.start), format_datetime(query.range.end)];
        if let Some(model_id) = &query.model_id {
            sql.push_str(" AND model_id = ?");
            values.push(model_id.clone());
        }
        if let Some(symbols) = &query.symbols {
            if symbols.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND symbol IN ({})", placeholders(symbols.len())));
            values.extend(symbols.iter().cloned());
        }
        sql.push_str(" ORDER BY symbol ASC, predict_from_date ASC, model_id ASC");

        let mut stmt = conn.prepare(&sql).map_err(query_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Prediction {
                    model_id: row.get(0)?,
                    symbol: row.get(1)?,
                    predict_from_date: parse_time(row.get(2)?)?,
                    created_date: parse_time(row.get(3)?)?,
                    prediction: row.get(4)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}
