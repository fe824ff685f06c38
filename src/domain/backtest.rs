//! Walk-forward backtesting.
//!
//! A strategy is trained on the first part of a symbol's history, then asked
//! for a decision at every later bar given only the bars before it. Decisions
//! are evaluated in parallel and filled at the open of the bar they were made
//! for. [`track_balance`] replays the fills against a cash account.

use crate::domain::candle::Candle;
use crate::domain::error::NjordError;
use crate::domain::interval::{Interval, TimeRange};
use crate::domain::strategy::{Decision, DecisionKind, Strategy};
use crate::ports::data_port::CandleStore;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_cash: f64,
    /// Share of each symbol's bars used for training.
    pub train_test_ratio: f64,
    /// Worker threads; 0 uses the global rayon pool.
    pub threads: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start_cash: 10_000.0,
            train_test_ratio: 0.3,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Action {
    pub time: NaiveDateTime,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub cash: f64,
    pub assets: u64,
    pub latest_price: f64,
    pub total_value: f64,
    pub roi: f64,
}

/// Bar index where testing starts: `floor(ratio * len)`.
pub fn split_index(len: usize, ratio: f64) -> usize {
    ((ratio.clamp(0.0, 1.0) * len as f64).floor() as usize).min(len)
}

/// Train on `candles[..split_index]`, then collect the decision for every bar
/// `i >= split_index` made from `candles[..i]`, in time order.
pub fn backtest(
    strategy: &mut dyn Strategy,
    candles: &[Candle],
    split_index: usize,
    threads: usize,
) -> Result<Vec<Action>, NjordError> {
    let split_index = split_index.min(candles.len());
    strategy.train(&candles[..split_index])?;

    let strategy: &dyn Strategy = strategy;
    let run = || {
        (split_index..candles.len())
            .into_par_iter()
            .map(|i| {
                strategy.execute(&candles[..i]).map(|decision| {
                    decision.map(|decision| Action {
                        time: candles[i].time,
                        decision,
                    })
                })
            })
            .collect::<Result<Vec<_>, NjordError>>()
    };

    let decisions = if threads == 0 {
        run()?
    } else {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| NjordError::ConfigInvalid {
                section: "backtest".into(),
                key: "threads".into(),
                reason: e.to_string(),
            })?
            .install(run)?
    };
    Ok(decisions.into_iter().flatten().collect())
}

/// Replay actions against a cash account, filling at each action bar's open.
/// Sells are capped at the shares held and buys need enough cash. A final
/// snapshot is taken at the last candle.
pub fn track_balance(
    start_cash: f64,
    actions: &[Action],
    candles: &[Candle],
) -> BTreeMap<NaiveDateTime, Snapshot> {
    let opens: HashMap<NaiveDateTime, f64> = candles.iter().map(|c| (c.time, c.open)).collect();
    let mut cash = start_cash;
    let mut assets: u64 = 0;
    let mut invested = 0.0;
    let mut returned = 0.0;

    let snapshot = |cash: f64, assets: u64, price: f64, invested: f64, returned: f64| {
        let holdings = assets as f64 * price;
        Snapshot {
            cash,
            assets,
            latest_price: price,
            total_value: cash + holdings,
            roi: if invested > 0.0 {
                ((returned - invested) + holdings) / invested
            } else {
                0.0
            },
        }
    };

    let mut snapshots = BTreeMap::new();
    for action in actions {
        let Some(&price) = opens.get(&action.time) else {
            warn!(time = %action.time, "no candle for action, skipping");
            continue;
        };
        match action.decision.kind {
            DecisionKind::Sell => {
                let quantity = u64::from(action.decision.quantity).min(assets);
                if quantity > 0 {
                    let proceeds = price * quantity as f64;
                    cash += proceeds;
                    assets -= quantity;
                    returned += proceeds;
                }
            }
            DecisionKind::Buy => {
                let cost = price * f64::from(action.decision.quantity);
                if cash >= cost {
                    cash -= cost;
                    assets += u64::from(action.decision.quantity);
                    invested += cost;
                }
            }
        }
        snapshots.insert(action.time, snapshot(cash, assets, price, invested, returned));
    }

    if let Some(last) = candles.last() {
        snapshots.insert(last.time, snapshot(cash, assets, last.open, invested, returned));
    }
    snapshots
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub actions: usize,
    pub bars: usize,
    pub price_change: f64,
    pub gain_loss: f64,
    pub final_snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    /// Mean absolute gain over the symbols that ran, in cash units.
    pub average_gainloss: f64,
    pub results: BTreeMap<String, SymbolResult>,
}

fn run_symbol(
    strategy: &mut dyn Strategy,
    candles: &[Candle],
    config: &BacktestConfig,
) -> Result<SymbolResult, NjordError> {
    let split = split_index(candles.len(), config.train_test_ratio);
    if split >= candles.len() {
        return Err(NjordError::InsufficientData {
            symbol: candles.first().map(|c| c.symbol.clone()).unwrap_or_default(),
            rows: candles.len(),
            minimum: split + 1,
        });
    }
    let actions = backtest(strategy, candles, split, config.threads)?;
    let balance = track_balance(config.start_cash, &actions, candles);

    let base = candles[split].close;
    let price_change = candles
        .last()
        .map_or(0.0, |last| (last.close - base) / base * 100.0);
    let final_snapshot = balance.values().next_back().copied();
    let gain_loss = final_snapshot.map_or(0.0, |s| {
        (s.total_value - config.start_cash) / config.start_cash * 100.0
    });
    Ok(SymbolResult {
        actions: actions.len(),
        bars: candles.len(),
        price_change,
        gain_loss,
        final_snapshot,
    })
}

/// Backtest a fresh strategy per symbol over stored candles. Failing symbols
/// are logged and left out of the summary.
pub fn comprehensive_backtest<F>(
    mut factory: F,
    store: &dyn CandleStore,
    symbols: &[String],
    range: &TimeRange,
    interval: Interval,
    config: &BacktestConfig,
) -> BacktestSummary
where
    F: FnMut(&str) -> Result<Box<dyn Strategy>, NjordError>,
{
    let mut results = BTreeMap::new();
    for symbol in symbols {
        info!(%symbol, "backtesting");
        let outcome = store
            .fetch_candles(&BTreeSet::from([symbol.clone()]), range, interval)
            .and_then(|candles| {
                if candles.is_empty() {
                    return Err(NjordError::NoData {
                        symbol: symbol.clone(),
                    });
                }
                let mut strategy = factory(symbol)?;
                run_symbol(strategy.as_mut(), &candles, config)
            });
        match outcome {
            Ok(result) => {
                info!(
                    %symbol,
                    actions = result.actions,
                    active_pct = result.actions as f64 / result.bars as f64 * 100.0,
                    price_change = result.price_change,
                    gain_loss = result.gain_loss,
                    roi = result.final_snapshot.map_or(0.0, |s| s.roi * 100.0),
                    "backtest finished"
                );
                results.insert(symbol.clone(), result);
            }
            Err(e) => warn!(%symbol, error = %e, "backtest failed"),
        }
    }

    let gains: Vec<f64> = results
        .values()
        .map(|r| r.final_snapshot.map_or(config.start_cash, |s| s.total_value) - config.start_cash)
        .collect();
    let average_gainloss = if gains.is_empty() {
        0.0
    } else {
        gains.iter().sum::<f64>() / gains.len() as f64
    };
    BacktestSummary {
        average_gainloss,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candles(opens: &[f64]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        opens
            .iter()
            .enumerate()
            .map(|(i, &open)| Candle {
                symbol: "AAA".into(),
                time: start + Duration::days(i as i64),
                open,
                high: open + 1.0,
                low: open - 1.0,
                close: open + 0.5,
                volume: 10.0,
            })
            .collect()
    }

    /// Buys on even history lengths, sells on odd ones.
    struct Alternating {
        trained_on: usize,
        calls: AtomicUsize,
    }

    impl Strategy for Alternating {
        fn train(&mut self, history: &[Candle]) -> Result<(), NjordError> {
            self.trained_on = history.len();
            Ok(())
        }

        fn execute(&self, history: &[Candle]) -> Result<Option<Decision>, NjordError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(if history.len() % 2 == 0 {
                Decision::buy(1)
            } else {
                Decision::sell(1)
            }))
        }
    }

    #[test]
    fn split_index_floors() {
        assert_eq!(split_index(10, 0.3), 3);
        assert_eq!(split_index(7, 0.3), 2);
        assert_eq!(split_index(5, 2.0), 5);
    }

    #[test]
    fn backtest_trains_on_head_and_stamps_bars() {
        let data = candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let mut strategy = Alternating {
            trained_on: 0,
            calls: AtomicUsize::new(0),
        };
        let actions = backtest(&mut strategy, &data, 2, 2).unwrap();
        assert_eq!(strategy.trained_on, 2);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 4);
        let times: Vec<_> = actions.iter().map(|a| a.time).collect();
        assert_eq!(times, data[2..].iter().map(|c| c.time).collect::<Vec<_>>());
        assert_eq!(actions[0].decision, Decision::buy(1));
        assert_eq!(actions[1].decision, Decision::sell(1));
    }

    #[test]
    fn track_balance_fills_at_open() {
        let data = candles(&[10.0, 12.0, 15.0, 20.0]);
        let actions = vec![
            Action {
                time: data[0].time,
                decision: Decision::buy(1),
            },
            Action {
                time: data[2].time,
                decision: Decision::sell(1),
            },
        ];
        let balance = track_balance(100.0, &actions, &data);
        let first = balance[&data[0].time];
        assert_eq!(first.assets, 1);
        assert_relative_eq!(first.cash, 90.0);
        assert_relative_eq!(first.total_value, 100.0);
        assert_relative_eq!(first.roi, 0.0);

        let sold = balance[&data[2].time];
        assert_eq!(sold.assets, 0);
        assert_relative_eq!(sold.cash, 105.0);
        assert_relative_eq!(sold.roi, 0.5);

        let last = balance[&data[3].time];
        assert_relative_eq!(last.total_value, 105.0);
    }

    #[test]
    fn track_balance_rejects_unaffordable_and_uncovered() {
        let data = candles(&[50.0, 60.0]);
        let actions = vec![
            Action {
                time: data[0].time,
                decision: Decision::sell(1),
            },
            Action {
                time: data[1].time,
                decision: Decision::buy(1),
            },
        ];
        let balance = track_balance(40.0, &actions, &data);
        let last = balance[&data[1].time];
        assert_eq!(last.assets, 0);
        assert_relative_eq!(last.cash, 40.0);
        assert_relative_eq!(last.roi, 0.0);
    }

    #[test]
    fn sell_is_capped_at_holdings() {
        let data = candles(&[10.0, 10.0, 10.0]);
        let actions = vec![
            Action {
                time: data[0].time,
                decision: Decision::buy(1),
            },
            Action {
                time: data[1].time,
                decision: Decision::sell(5),
            },
        ];
        let balance = track_balance(100.0, &actions, &data);
        assert_eq!(balance[&data[1].time].assets, 0);
        assert_relative_eq!(balance[&data[1].time].cash, 100.0);
    }
}
