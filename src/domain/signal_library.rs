//! Standard computed-signal library.
//!
//! Each entry adapts one indicator function to the [`ComputedSignal`]
//! interface. Single-series indicators read their input from `base`; range
//! indicators (ATR, ADX, CCI, Donchian, OBV) expect `base` to be a candle
//! frame and read the columns they need.

use crate::domain::error::NjordError;
use crate::domain::indicator::{self, KstParams};
use crate::domain::registry::{ComputeArgs, ComputedSignal, ParamSpec, SignalRegistry};
use crate::domain::series::{Frame, Series};
use crate::domain::signal::SignalValue;

type ComputeFn = fn(&ComputeArgs<'_>) -> Result<SignalValue, NjordError>;

/// A computed signal backed by a plain function.
pub struct IndicatorSignal {
    params: Vec<ParamSpec>,
    compute: ComputeFn,
}

impl IndicatorSignal {
    pub fn new(params: Vec<ParamSpec>, compute: ComputeFn) -> Self {
        Self { params, compute }
    }
}

impl ComputedSignal for IndicatorSignal {
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn compute(&self, args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
        (self.compute)(args)
    }
}

const BASE: ParamSpec = ParamSpec::signal("base");

fn base_values<'a>(args: &ComputeArgs<'a>) -> Result<&'a [f64], NjordError> {
    Ok(&args.series("base")?.values)
}

fn series_out(args: &ComputeArgs<'_>, values: Vec<f64>) -> Result<SignalValue, NjordError> {
    Ok(SignalValue::Series(Series::new(
        args.index("base")?.to_vec(),
        values,
    )))
}

fn frame_out(
    args: &ComputeArgs<'_>,
    columns: Vec<(&str, Vec<f64>)>,
) -> Result<SignalValue, NjordError> {
    let mut frame = Frame::new(args.index("base")?.to_vec());
    for (name, values) in columns {
        frame.push_column(name, values);
    }
    Ok(SignalValue::Frame(frame))
}

fn hlc<'a>(args: &ComputeArgs<'a>) -> Result<(&'a [f64], &'a [f64], &'a [f64]), NjordError> {
    Ok((
        args.frame_column("base", "high")?,
        args.frame_column("base", "low")?,
        args.frame_column("base", "close")?,
    ))
}

fn sma(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_sma(base_values(args)?, args.window("window")?))
}

fn ema(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_ema(base_values(args)?, args.window("window")?))
}

fn wma(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_wma(base_values(args)?, args.window("window")?))
}

fn rsi(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_rsi(base_values(args)?, args.window("window")?))
}

fn kama(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let values = indicator::calculate_kama(
        base_values(args)?,
        args.window("window")?,
        args.window("pow1")?,
        args.window("pow2")?,
    );
    series_out(args, values)
}

fn percent_price_osc(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let out = indicator::calculate_ppo(
        base_values(args)?,
        args.window("fast")?,
        args.window("slow")?,
        args.window("signal")?,
    );
    frame_out(
        args,
        vec![("ppo", out.line), ("ppo_signal", out.signal), ("ppo_hist", out.diff)],
    )
}

fn macd(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let out = indicator::calculate_macd(
        base_values(args)?,
        args.window("fast")?,
        args.window("slow")?,
        args.window("signal")?,
    );
    frame_out(
        args,
        vec![("macd", out.line), ("macd_signal", out.signal), ("macd_diff", out.diff)],
    )
}

fn roc(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_roc(base_values(args)?, args.window("window")?))
}

fn percent_change(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let window = args.int("window")?;
    if window == 0 {
        return Err(NjordError::InvalidArgument {
            id: args.id.to_string(),
            arg: "window".into(),
            reason: "must be non-zero".into(),
        });
    }
    series_out(args, indicator::calculate_percent_change(base_values(args)?, window))
}

fn stddev(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(args, indicator::calculate_stddev(base_values(args)?, args.window("window")?))
}

fn bollinger(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let out = indicator::calculate_bollinger(
        base_values(args)?,
        args.window("window")?,
        args.float("window_dev")?,
    );
    frame_out(
        args,
        vec![
            ("mavg", out.mavg),
            ("hband", out.hband),
            ("lband", out.lband),
            ("wband", out.wband),
            ("pband", out.pband),
        ],
    )
}

fn avg_true_range(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let (high, low, close) = hlc(args)?;
    series_out(args, indicator::calculate_atr(high, low, close, args.window("window")?))
}

fn donchian(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let (high, low, close) = hlc(args)?;
    let out = indicator::calculate_donchian(high, low, close, args.window("window")?);
    frame_out(
        args,
        vec![
            ("hband", out.hband),
            ("lband", out.lband),
            ("mband", out.mband),
            ("wband", out.wband),
            ("pband", out.pband),
        ],
    )
}

fn ulcer_index(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    series_out(
        args,
        indicator::calculate_ulcer_index(base_values(args)?, args.window("window")?),
    )
}

fn adx(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let (high, low, close) = hlc(args)?;
    let out = indicator::calculate_adx(high, low, close, args.window("window")?);
    frame_out(
        args,
        vec![("adx", out.adx), ("adx_pos", out.adx_pos), ("adx_neg", out.adx_neg)],
    )
}

fn aroon(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let out = indicator::calculate_aroon(base_values(args)?, args.window("window")?);
    frame_out(
        args,
        vec![
            ("aroon_up", out.up),
            ("aroon_down", out.down),
            ("aroon_indicator", out.indicator),
        ],
    )
}

fn cci(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let (high, low, close) = hlc(args)?;
    let values = indicator::calculate_cci(
        high,
        low,
        close,
        args.window("window")?,
        args.float("constant")?,
    );
    series_out(args, values)
}

fn kst(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let params = KstParams {
        roc: [
            args.window("roc1")?,
            args.window("roc2")?,
            args.window("roc3")?,
            args.window("roc4")?,
        ],
        window: [
            args.window("window1")?,
            args.window("window2")?,
            args.window("window3")?,
            args.window("window4")?,
        ],
        nsig: args.window("nsig")?,
    };
    let out = indicator::calculate_kst(base_values(args)?, &params);
    frame_out(
        args,
        vec![("kst", out.kst), ("kst_sig", out.signal), ("kst_diff", out.diff)],
    )
}

fn obv(args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
    let close = args.frame_column("base", "close")?;
    let volume = args.frame_column("base", "volume")?;
    series_out(args, indicator::calculate_obv(close, volume))
}

/// Register every standard indicator on `registry`.
pub fn register_standard(registry: &mut SignalRegistry) -> Result<(), NjordError> {
    let window = |default| vec![BASE, ParamSpec::int("window", default)];
    let crossover = || {
        vec![
            BASE,
            ParamSpec::int("fast", 12),
            ParamSpec::int("slow", 26),
            ParamSpec::int("signal", 9),
        ]
    };

    let entries: Vec<(&str, IndicatorSignal)> = vec![
        ("sma", IndicatorSignal::new(window(20), sma)),
        ("ema", IndicatorSignal::new(window(14), ema)),
        ("wma", IndicatorSignal::new(window(20), wma)),
        ("rsi", IndicatorSignal::new(window(14), rsi)),
        (
            "kama",
            IndicatorSignal::new(
                vec![
                    BASE,
                    ParamSpec::int("window", 10),
                    ParamSpec::int("pow1", 2),
                    ParamSpec::int("pow2", 30),
                ],
                kama,
            ),
        ),
        ("percent_price_osc", IndicatorSignal::new(crossover(), percent_price_osc)),
        ("macd", IndicatorSignal::new(crossover(), macd)),
        ("roc", IndicatorSignal::new(window(12), roc)),
        ("percent_change", IndicatorSignal::new(window(1), percent_change)),
        ("stddev", IndicatorSignal::new(window(20), stddev)),
        (
            "bollinger",
            IndicatorSignal::new(
                vec![BASE, ParamSpec::int("window", 20), ParamSpec::float("window_dev", 2.0)],
                bollinger,
            ),
        ),
        ("avg_true_range", IndicatorSignal::new(window(14), avg_true_range)),
        ("donchian", IndicatorSignal::new(window(20), donchian)),
        ("ulcer_index", IndicatorSignal::new(window(14), ulcer_index)),
        ("adx", IndicatorSignal::new(window(14), adx)),
        ("aroon", IndicatorSignal::new(window(25), aroon)),
        (
            "cci",
            IndicatorSignal::new(
                vec![BASE, ParamSpec::int("window", 20), ParamSpec::float("constant", 0.015)],
                cci,
            ),
        ),
        (
            "kst",
            IndicatorSignal::new(
                vec![
                    BASE,
                    ParamSpec::int("roc1", 10),
                    ParamSpec::int("roc2", 15),
                    ParamSpec::int("roc3", 20),
                    ParamSpec::int("roc4", 30),
                    ParamSpec::int("window1", 10),
                    ParamSpec::int("window2", 10),
                    ParamSpec::int("window3", 10),
                    ParamSpec::int("window4", 15),
                    ParamSpec::int("nsig", 9),
                ],
                kst,
            ),
        ),
        ("obv", IndicatorSignal::new(vec![BASE], obv)),
    ];

    for (id, signal) in entries {
        registry.register_computed(id, signal)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::LiteralArgs;
    use crate::domain::signal::Signal;
    use crate::domain::signal_expr::Literal;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeMap;

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn close_signal(values: Vec<f64>) -> Signal {
        Signal::new(
            "candles[close]",
            SignalValue::Series(Series::new(index(values.len()), values)),
        )
    }

    fn compute(id: &str, literals: LiteralArgs, base: &Signal) -> Result<SignalValue, NjordError> {
        let registry = SignalRegistry::standard().unwrap();
        let signal = registry.computed(id).unwrap();
        let mut filled = literals;
        for spec in signal.params() {
            if let Some(default) = spec.default_literal() {
                filled.entry(spec.name.to_string()).or_insert(default);
            }
        }
        let args = ComputeArgs {
            id,
            literals: &filled,
            inputs: BTreeMap::from([("base", base)]),
        };
        signal.compute(&args)
    }

    #[test]
    fn standard_registry_has_library() {
        let registry = SignalRegistry::standard().unwrap();
        for id in ["rsi", "kama", "percent_price_osc", "avg_true_range", "kst", "percent_change"] {
            assert!(registry.computed(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn rsi_produces_series_on_base_index() {
        let base = close_signal((0..30).map(|i| 100.0 + i as f64).collect());
        let value = compute("rsi", LiteralArgs::new(), &base).unwrap();
        match value {
            SignalValue::Series(s) => {
                assert_eq!(s.index, index(30));
                assert!(s.values[13].is_nan());
                assert!((s.values[14] - 100.0).abs() < 1e-9);
            }
            SignalValue::Frame(_) => panic!("expected series"),
        }
    }

    #[test]
    fn macd_produces_named_columns() {
        let base = close_signal((0..40).map(|i| i as f64).collect());
        let value = compute("macd", LiteralArgs::new(), &base).unwrap();
        match value {
            SignalValue::Frame(f) => {
                let names: Vec<&str> = f.column_names().collect();
                assert_eq!(names, vec!["macd", "macd_signal", "macd_diff"]);
            }
            SignalValue::Series(_) => panic!("expected frame"),
        }
    }

    #[test]
    fn percent_change_rejects_zero_window() {
        let base = close_signal(vec![1.0, 2.0]);
        let literals: LiteralArgs = [("window".to_string(), Literal::Int(0))].into();
        assert!(matches!(
            compute("percent_change", literals, &base),
            Err(NjordError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn range_indicator_needs_frame() {
        let base = close_signal(vec![1.0, 2.0, 3.0]);
        assert!(compute("avg_true_range", LiteralArgs::new(), &base).is_err());
    }

    #[test]
    fn range_indicator_reads_candle_frame() {
        let n = 20;
        let frame = Frame::new(index(n))
            .with_column("high", (0..n).map(|i| i as f64 + 1.0).collect())
            .with_column("low", (0..n).map(|i| i as f64 - 1.0).collect())
            .with_column("close", (0..n).map(|i| i as f64).collect());
        let base = Signal::new("candles", SignalValue::Frame(frame));
        let literals: LiteralArgs = [("window".to_string(), Literal::Int(5))].into();
        match compute("avg_true_range", literals, &base).unwrap() {
            SignalValue::Series(s) => assert!((s.values[10] - 2.0).abs() < 1e-9),
            SignalValue::Frame(_) => panic!("expected series"),
        }
    }
}
