//! Leaf fetchers: candle data from a store or from memory.

use crate::domain::candle::Candle;
use crate::domain::error::NjordError;
use crate::domain::interval::Interval;
use crate::domain::registry::{FetchOptions, Fetcher, LiteralArgs, ParamSpec, SignalRegistry};
use crate::domain::series::Frame;
use crate::ports::data_port::CandleStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Group candles (already ordered by symbol then time) into one OHLCV frame
/// per symbol.
pub fn frames_by_symbol(candles: &[Candle]) -> BTreeMap<String, Frame> {
    let mut out = BTreeMap::new();
    for chunk in candles.chunk_by(|a, b| a.symbol == b.symbol) {
        out.insert(chunk[0].symbol.clone(), Frame::from_candles(chunk));
    }
    out
}

/// Candles from a [`CandleStore`]. With a fixed interval the fetcher takes no
/// arguments; otherwise it accepts `interval` (default `1day`).
pub struct CandleFetcher {
    store: Arc<dyn CandleStore>,
    interval: Option<Interval>,
    params: Vec<ParamSpec>,
}

impl CandleFetcher {
    pub fn fixed(store: Arc<dyn CandleStore>, interval: Interval) -> Self {
        Self {
            store,
            interval: Some(interval),
            params: Vec::new(),
        }
    }

    pub fn configurable(store: Arc<dyn CandleStore>) -> Self {
        Self {
            store,
            interval: None,
            params: vec![ParamSpec::text("interval", "1day")],
        }
    }

    fn resolve_interval(&self, args: &LiteralArgs) -> Result<Interval, NjordError> {
        if let Some(interval) = self.interval {
            return Ok(interval);
        }
        let text = args
            .get("interval")
            .and_then(|l| l.as_text())
            .unwrap_or("1day");
        Interval::parse(text).map_err(|e| NjordError::InvalidArgument {
            id: "candles".into(),
            arg: "interval".into(),
            reason: e.message,
        })
    }
}

impl Fetcher for CandleFetcher {
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn fetch(
        &self,
        args: &LiteralArgs,
        options: &FetchOptions,
    ) -> Result<BTreeMap<String, Frame>, NjordError> {
        let interval = self.resolve_interval(args)?;
        let candles = self
            .store
            .fetch_candles(&options.symbols, &options.range, interval)?;
        debug!(
            interval = %interval,
            rows = candles.len(),
            symbols = options.symbols.len(),
            "fetched candles"
        );
        Ok(frames_by_symbol(&candles))
    }
}

/// Pre-loaded frames, trimmed to the requested symbols and range.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    frames: BTreeMap<String, Frame>,
}

impl MemoryFetcher {
    pub fn new(frames: BTreeMap<String, Frame>) -> Self {
        Self { frames }
    }

    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut sorted = candles.to_vec();
        crate::domain::candle::sort_and_dedup(&mut sorted);
        Self::new(frames_by_symbol(&sorted))
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(
        &self,
        _args: &LiteralArgs,
        options: &FetchOptions,
    ) -> Result<BTreeMap<String, Frame>, NjordError> {
        Ok(options
            .symbols
            .iter()
            .filter_map(|s| {
                self.frames
                    .get(s)
                    .map(|f| (s.clone(), f.filter_range(&options.range)))
            })
            .filter(|(_, f)| !f.is_empty())
            .collect())
    }
}

/// Candle fetcher ids registered by [`register_store_fetchers`].
pub const STORE_FETCHERS: &[(&str, &str)] = &[
    ("candles_1min", "1min"),
    ("candles_5min", "5min"),
    ("candles_15min", "15min"),
    ("candles_1hour", "1hour"),
    ("candles_1day", "1day"),
];

/// Register `candles` plus the fixed-interval `candles_*` fetchers.
pub fn register_store_fetchers(
    registry: &mut SignalRegistry,
    store: Arc<dyn CandleStore>,
) -> Result<(), NjordError> {
    registry.register_fetcher("candles", CandleFetcher::configurable(Arc::clone(&store)))?;
    for (id, interval) in STORE_FETCHERS {
        let interval = Interval::parse(interval)?;
        registry.register_fetcher(*id, CandleFetcher::fixed(Arc::clone(&store), interval))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::TimeRange;
    use chrono::{NaiveDate, NaiveDateTime};

    fn time(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn candle(symbol: &str, day: u32, close: f64) -> Candle {
        Candle {
            symbol: symbol.into(),
            time: time(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn frames_group_by_symbol() {
        let candles = vec![candle("A", 1, 1.0), candle("A", 2, 2.0), candle("B", 1, 5.0)];
        let frames = frames_by_symbol(&candles);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames["A"].column("close"), Some(&[1.0, 2.0][..]));
        assert_eq!(frames["B"].len(), 1);
    }

    #[test]
    fn memory_fetcher_filters_symbols_and_range() {
        let fetcher = MemoryFetcher::from_candles(&[
            candle("A", 3, 3.0),
            candle("A", 1, 1.0),
            candle("A", 2, 2.0),
            candle("B", 1, 5.0),
        ]);
        let options = FetchOptions::new(["A", "C"], TimeRange::new(time(2), time(3)));
        let frames = fetcher.fetch(&LiteralArgs::new(), &options).unwrap();
        assert_eq!(frames.keys().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(frames["A"].index, vec![time(2), time(3)]);
    }
}
