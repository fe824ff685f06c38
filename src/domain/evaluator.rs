//! Binding and evaluation of signal expressions.
//!
//! Evaluation happens in two steps. [`bind`] resolves every node of a
//! [`SignalExpr`] against the registry and checks its arguments, producing a
//! [`BoundExpr`] tree with no unknown ids left in it. The [`Evaluator`] then
//! walks that tree post-order, computing each node once per request and
//! caching the per-symbol result under the node's qualified id.
//!
//! Selection is cached separately from the node it selects from, so
//! `candles_5min[open]` and `candles_5min[close]` share a single fetch.

use crate::domain::error::NjordError;
use crate::domain::registry::{
    ComputeArgs, ComputedSignal, FetchOptions, Fetcher, LiteralArgs, ParamKind, ParamSpec,
    RegistryEntry, SignalRegistry,
};
use crate::domain::signal::{Signal, SignalValue};
use crate::domain::signal_expr::{Arg, Literal, SignalExpr};
use crate::domain::signal_set::SignalSet;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-symbol result of evaluating one expression.
pub type SymbolSignals = BTreeMap<String, Signal>;

pub enum BoundExpr {
    Fetch {
        key: String,
        fetcher: Arc<dyn Fetcher>,
        literals: LiteralArgs,
        select: Option<String>,
    },
    Call {
        key: String,
        signal: Arc<dyn ComputedSignal>,
        literals: LiteralArgs,
        inputs: Vec<(String, BoundExpr)>,
        select: Option<String>,
    },
}

impl BoundExpr {
    /// Qualified id of the node without its selector.
    pub fn key(&self) -> &str {
        match self {
            BoundExpr::Fetch { key, .. } | BoundExpr::Call { key, .. } => key,
        }
    }

    pub fn select(&self) -> Option<&str> {
        match self {
            BoundExpr::Fetch { select, .. } | BoundExpr::Call { select, .. } => select.as_deref(),
        }
    }

    /// Qualified id including the selector; this names the resulting signal.
    pub fn qualified_id(&self) -> String {
        match self.select() {
            Some(field) => format!("{}[{}]", self.key(), field),
            None => self.key().to_string(),
        }
    }
}

impl fmt::Debug for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExpr::Fetch { literals, .. } => f
                .debug_struct("Fetch")
                .field("id", &self.qualified_id())
                .field("literals", literals)
                .finish(),
            BoundExpr::Call {
                literals, inputs, ..
            } => f
                .debug_struct("Call")
                .field("id", &self.qualified_id())
                .field("literals", literals)
                .field("inputs", inputs)
                .finish(),
        }
    }
}

fn invalid(id: &str, arg: &str, reason: impl Into<String>) -> NjordError {
    NjordError::InvalidArgument {
        id: id.to_string(),
        arg: arg.to_string(),
        reason: reason.into(),
    }
}

/// Check a literal against its declared kind. Ints widen to floats.
fn coerce_literal(id: &str, spec: &ParamSpec, value: &Literal) -> Result<Literal, NjordError> {
    if let Literal::Float(v) = value {
        if !v.is_finite() {
            return Err(invalid(id, spec.name, format!("{v} is not a finite number")));
        }
    }
    match (&spec.kind, value) {
        (ParamKind::Int { .. }, Literal::Int(_))
        | (ParamKind::Float { .. }, Literal::Float(_))
        | (ParamKind::Text { .. }, Literal::Text(_)) => Ok(value.clone()),
        (ParamKind::Float { .. }, Literal::Int(v)) => Ok(Literal::Float(*v as f64)),
        (ParamKind::Signal, _) => Err(invalid(id, spec.name, "expected a signal expression")),
        (kind, other) => Err(invalid(
            id,
            spec.name,
            format!("expected {}, got {}", kind_name(kind), other.kind_name()),
        )),
    }
}

fn kind_name(kind: &ParamKind) -> &'static str {
    match kind {
        ParamKind::Int { .. } => "int",
        ParamKind::Float { .. } => "float",
        ParamKind::Text { .. } => "text",
        ParamKind::Signal => "signal",
    }
}

/// Match explicit literal args to `params`, filling defaults.
fn bind_literals(expr: &SignalExpr, params: &[ParamSpec]) -> Result<LiteralArgs, NjordError> {
    for name in expr.args.keys() {
        if !params.iter().any(|p| p.name == name) {
            return Err(invalid(&expr.id, name, "unknown argument"));
        }
    }

    let mut literals = LiteralArgs::new();
    for spec in params {
        if spec.kind == ParamKind::Signal {
            continue;
        }
        match expr.args.get(spec.name) {
            Some(Arg::Value(value)) => {
                literals.insert(spec.name.to_string(), coerce_literal(&expr.id, spec, value)?);
            }
            Some(Arg::Signal(_)) => {
                return Err(invalid(&expr.id, spec.name, "expected a literal value"));
            }
            None => match spec.default_literal() {
                Some(default) => {
                    literals.insert(spec.name.to_string(), default);
                }
                None => return Err(invalid(&expr.id, spec.name, "missing required argument")),
            },
        }
    }
    Ok(literals)
}

/// Resolve `expr` against `registry`. Fails on unknown ids, unknown or
/// mistyped arguments and missing required arguments.
pub fn bind(expr: &SignalExpr, registry: &SignalRegistry) -> Result<BoundExpr, NjordError> {
    let key = expr.without_select().qualified_id();
    let select = expr.select.clone();

    match registry.get(&expr.id) {
        Some(RegistryEntry::Fetcher(fetcher)) => {
            if let Some((name, _)) = expr.signal_args().next() {
                return Err(invalid(&expr.id, name, "fetchers take no signal arguments"));
            }
            Ok(BoundExpr::Fetch {
                key,
                literals: bind_literals(expr, fetcher.params())?,
                fetcher: Arc::clone(fetcher),
                select,
            })
        }
        Some(RegistryEntry::Computed(signal)) => {
            let params = signal.params();
            let literals = bind_literals(expr, params)?;
            let mut inputs = Vec::new();
            for spec in params.iter().filter(|p| p.kind == ParamKind::Signal) {
                match expr.args.get(spec.name) {
                    Some(Arg::Signal(child)) => {
                        inputs.push((spec.name.to_string(), bind(child, registry)?));
                    }
                    Some(Arg::Value(_)) => {
                        return Err(invalid(&expr.id, spec.name, "expected a signal expression"));
                    }
                    None => return Err(invalid(&expr.id, spec.name, "missing input signal")),
                }
            }
            Ok(BoundExpr::Call {
                key,
                signal: Arc::clone(signal),
                literals,
                inputs,
                select,
            })
        }
        None => Err(NjordError::UnknownSignal {
            id: expr.id.clone(),
        }),
    }
}

/// Memoizing evaluator for one fetch request.
pub struct Evaluator<'r> {
    registry: &'r SignalRegistry,
    options: FetchOptions,
    cache: HashMap<String, Arc<SymbolSignals>>,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r SignalRegistry, options: FetchOptions) -> Self {
        Self {
            registry,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Number of cached nodes (selected and unselected).
    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }

    /// Evaluate one expression for every requested symbol that has data.
    pub fn fetch_signal(&mut self, expr: &SignalExpr) -> Result<Arc<SymbolSignals>, NjordError> {
        let bound = bind(expr, self.registry)?;
        self.eval(&bound)
    }

    fn eval(&mut self, bound: &BoundExpr) -> Result<Arc<SymbolSignals>, NjordError> {
        let full_key = bound.qualified_id();
        if let Some(hit) = self.cache.get(&full_key) {
            return Ok(Arc::clone(hit));
        }

        let node = match self.cache.get(bound.key()) {
            Some(hit) => Arc::clone(hit),
            None => {
                let computed = Arc::new(self.eval_node(bound)?);
                self.cache
                    .insert(bound.key().to_string(), Arc::clone(&computed));
                computed
            }
        };

        let Some(field) = bound.select() else {
            return Ok(node);
        };
        let selected = node
            .iter()
            .map(|(symbol, signal)| Ok((symbol.clone(), signal.select(field)?)))
            .collect::<Result<SymbolSignals, NjordError>>()?;
        let selected = Arc::new(selected);
        self.cache.insert(full_key, Arc::clone(&selected));
        Ok(selected)
    }

    fn eval_node(&mut self, bound: &BoundExpr) -> Result<SymbolSignals, NjordError> {
        match bound {
            BoundExpr::Fetch {
                key,
                fetcher,
                literals,
                ..
            } => {
                debug!(signal = %key, "fetching");
                let frames = fetcher.fetch(literals, &self.options)?;
                Ok(frames
                    .into_iter()
                    .filter(|(symbol, _)| self.options.symbols.contains(symbol))
                    .map(|(symbol, frame)| (symbol, Signal::new(key.clone(), SignalValue::Frame(frame))))
                    .collect())
            }
            BoundExpr::Call {
                key,
                signal,
                literals,
                inputs,
                ..
            } => {
                let mut resolved = Vec::with_capacity(inputs.len());
                for (name, child) in inputs {
                    resolved.push((name.as_str(), self.eval(child)?));
                }
                debug!(signal = %key, "computing");

                let symbols: BTreeSet<&String> = match resolved.split_first() {
                    Some(((_, first), rest)) => first
                        .keys()
                        .filter(|s| rest.iter().all(|(_, r)| r.contains_key(*s)))
                        .collect(),
                    None => self.options.symbols.iter().collect(),
                };

                let mut out = SymbolSignals::new();
                for symbol in symbols {
                    let args = ComputeArgs {
                        id: key,
                        literals,
                        inputs: resolved
                            .iter()
                            .filter_map(|(name, values)| values.get(symbol).map(|s| (*name, s)))
                            .collect(),
                    };
                    let value = signal.compute(&args)?;
                    out.insert(symbol.clone(), Signal::new(key.clone(), value));
                }
                Ok(out)
            }
        }
    }

    /// Evaluate features and labels and assemble one [`SignalSet`] per
    /// symbol. Symbols lacking any of the signals are skipped with a warning.
    pub fn fetch_signal_set(
        &mut self,
        features: &[SignalExpr],
        labels: &[SignalExpr],
    ) -> Result<BTreeMap<String, SignalSet>, NjordError> {
        if features.is_empty() {
            return Err(NjordError::NoFeatures);
        }

        // Bind everything up front so a bad expression fails before any fetch.
        let bound_features = features
            .iter()
            .map(|e| bind(e, self.registry))
            .collect::<Result<Vec<_>, _>>()?;
        let bound_labels = labels
            .iter()
            .map(|e| bind(e, self.registry))
            .collect::<Result<Vec<_>, _>>()?;

        let feature_values = bound_features
            .iter()
            .map(|b| self.eval(b))
            .collect::<Result<Vec<_>, _>>()?;
        let label_values = bound_labels
            .iter()
            .map(|b| self.eval(b))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sets = BTreeMap::new();
        'symbols: for symbol in &self.options.symbols {
            let mut set = SignalSet::new();
            for (bound, values) in bound_features.iter().zip(&feature_values) {
                match values.get(symbol) {
                    Some(signal) => set.add_feature(signal),
                    None => {
                        warn!(%symbol, signal = %bound.qualified_id(), "skipping symbol without data");
                        continue 'symbols;
                    }
                }
            }
            for (bound, values) in bound_labels.iter().zip(&label_values) {
                match values.get(symbol) {
                    Some(signal) => set.add_label(signal)?,
                    None => {
                        warn!(%symbol, signal = %bound.qualified_id(), "skipping symbol without label data");
                        continue 'symbols;
                    }
                }
            }
            sets.insert(symbol.clone(), set);
        }

        if sets.is_empty() {
            warn!(symbols = self.options.symbols.len(), "no symbol produced a signal set");
        }
        Ok(sets)
    }
}

/// One-shot evaluation of a single expression.
pub fn fetch_signal(
    registry: &SignalRegistry,
    expr: &SignalExpr,
    options: &FetchOptions,
) -> Result<Arc<SymbolSignals>, NjordError> {
    Evaluator::new(registry, options.clone()).fetch_signal(expr)
}

/// One-shot evaluation of a feature/label set.
pub fn fetch_signal_set(
    registry: &SignalRegistry,
    features: &[SignalExpr],
    labels: &[SignalExpr],
    options: &FetchOptions,
) -> Result<BTreeMap<String, SignalSet>, NjordError> {
    Evaluator::new(registry, options.clone()).fetch_signal_set(features, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::TimeRange;
    use crate::domain::registry::ParamSpec;
    use crate::domain::series::{Frame, Series};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn time(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Serves a rising close for A and B, counting calls.
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(
            &self,
            _args: &LiteralArgs,
            options: &FetchOptions,
        ) -> Result<BTreeMap<String, Frame>, NjordError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index: Vec<NaiveDateTime> = (1..=20).map(time).collect();
            let mut out = BTreeMap::new();
            for (symbol, base) in [("A", 10.0), ("B", 50.0)] {
                if options.symbols.contains(symbol) {
                    let close: Vec<f64> = (0..20).map(|i| base + i as f64).collect();
                    let frame = Frame::new(index.clone())
                        .with_column("open", close.clone())
                        .with_column("close", close);
                    out.insert(symbol.to_string(), frame);
                }
            }
            Ok(out)
        }
    }

    fn setup() -> (SignalRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = SignalRegistry::standard().unwrap();
        registry
            .register_fetcher(
                "candles",
                CountingFetcher {
                    calls: Arc::clone(&calls),
                },
            )
            .unwrap();
        (registry, calls)
    }

    fn options(symbols: &[&str]) -> FetchOptions {
        FetchOptions::new(symbols.iter().copied(), TimeRange::new(time(1), time(31)))
    }

    fn close() -> SignalExpr {
        SignalExpr::new("candles").with_select("close")
    }

    #[test]
    fn fetch_selects_column_and_names_signal() {
        let (registry, _) = setup();
        let result = fetch_signal(&registry, &close(), &options(&["A"])).unwrap();
        let signal = &result["A"];
        assert_eq!(signal.name, "candles[close]");
        assert_eq!(signal.as_series().unwrap().values[0], 10.0);
    }

    #[test]
    fn computed_signal_uses_qualified_name() {
        let (registry, _) = setup();
        let expr = SignalExpr::new("sma").with_arg("window", 2).with_arg("base", close());
        let result = fetch_signal(&registry, &expr, &options(&["A", "B"])).unwrap();
        assert_eq!(result["B"].name, "sma<window=2>(base=candles[close])");
        let values = &result["B"].as_series().unwrap().values;
        assert!(values[0].is_nan());
        assert_eq!(values[1], 50.5);
    }

    #[test]
    fn shared_leaf_is_fetched_once() {
        let (registry, calls) = setup();
        let mut evaluator = Evaluator::new(&registry, options(&["A", "B"]));
        let open = SignalExpr::new("candles").with_select("open");
        let rsi = SignalExpr::new("rsi").with_arg("base", close());
        evaluator.fetch_signal(&close()).unwrap();
        evaluator.fetch_signal(&open).unwrap();
        evaluator.fetch_signal(&rsi).unwrap();
        evaluator.fetch_signal(&rsi).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // candles, candles[close], candles[open], rsi(...)
        assert_eq!(evaluator.cached_nodes(), 4);
    }

    #[test]
    fn unknown_id_fails_before_fetch() {
        let (registry, calls) = setup();
        let expr = SignalExpr::new("nope").with_arg("base", close());
        let err = fetch_signal(&registry, &expr, &options(&["A"])).unwrap_err();
        assert!(matches!(err, NjordError::UnknownSignal { id } if id == "nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let (registry, _) = setup();
        let expr = SignalExpr::new("rsi").with_arg("windw", 3).with_arg("base", close());
        assert!(matches!(
            bind(&expr, &registry),
            Err(NjordError::InvalidArgument { arg, .. }) if arg == "windw"
        ));
    }

    #[test]
    fn mistyped_arguments_are_rejected() {
        let (registry, _) = setup();
        let text_window = SignalExpr::new("rsi").with_arg("window", "x").with_arg("base", close());
        assert!(bind(&text_window, &registry).is_err());
        let literal_base = SignalExpr::new("rsi").with_arg("base", 3);
        assert!(bind(&literal_base, &registry).is_err());
        let missing_base = SignalExpr::new("rsi");
        assert!(bind(&missing_base, &registry).is_err());
        let leaf_with_input = SignalExpr::new("candles").with_arg("base", close());
        assert!(bind(&leaf_with_input, &registry).is_err());
    }

    #[test]
    fn int_widens_to_float_param() {
        let (registry, _) = setup();
        let expr = SignalExpr::new("bollinger").with_arg("window_dev", 3).with_arg("base", close());
        match bind(&expr, &registry).unwrap() {
            BoundExpr::Call { literals, key, .. } => {
                assert_eq!(literals["window_dev"], Literal::Float(3.0));
                assert_eq!(literals["window"], Literal::Int(20));
                // key reflects only explicit args
                assert_eq!(key, "bollinger<window_dev=3>(base=candles[close])");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_float_argument_is_rejected() {
        let (registry, _) = setup();
        for value in [f64::NAN, f64::INFINITY] {
            let expr = SignalExpr::new("bollinger").with_arg("window_dev", value).with_arg("base", close());
            assert!(matches!(
                bind(&expr, &registry),
                Err(NjordError::InvalidArgument { arg, .. }) if arg == "window_dev"
            ));
        }
        let parsed: SignalExpr = "bollinger<window_dev=inf>(base=candles[close])".parse().unwrap();
        assert!(bind(&parsed, &registry).is_err());
    }

    #[test]
    fn label_repeating_a_feature_fails() {
        let (registry, _) = setup();
        let err = fetch_signal_set(&registry, &[close()], &[close()], &options(&["A"])).unwrap_err();
        assert!(matches!(err, NjordError::Model { reason } if reason.contains("candles[close]")));
    }

    #[test]
    fn selecting_from_series_fails() {
        let (registry, _) = setup();
        let expr = SignalExpr::new("rsi").with_arg("base", close()).with_select("x");
        assert!(matches!(
            fetch_signal(&registry, &expr, &options(&["A"])),
            Err(NjordError::InvalidSelect { .. })
        ));
    }

    #[test]
    fn signal_set_requires_features() {
        let (registry, _) = setup();
        let err = fetch_signal_set(&registry, &[], &[close()], &options(&["A"])).unwrap_err();
        assert!(matches!(err, NjordError::NoFeatures));
    }

    #[test]
    fn signal_set_per_symbol_with_labels() {
        let (registry, _) = setup();
        let label = SignalExpr::new("percent_change").with_arg("window", 1).with_arg("base", close());
        let sets = fetch_signal_set(
            &registry,
            &[close(), SignalExpr::new("candles")],
            &[label.clone()],
            &options(&["A", "B", "MISSING"]),
        )
        .unwrap();
        assert_eq!(sets.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        let set = &sets["A"];
        assert_eq!(set.label_keys(), &[label.qualified_id()]);
        assert!(set.column("candles[close]").is_some());
        assert!(set.column("candles[open]").is_some());
    }

    struct Sum;

    impl ComputedSignal for Sum {
        fn params(&self) -> &[ParamSpec] {
            const PARAMS: &[ParamSpec] = &[ParamSpec::signal("a"), ParamSpec::signal("b")];
            PARAMS
        }

        fn compute(&self, args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError> {
            let a = args.series("a")?;
            let b = args.series("b")?;
            let values = a.values.iter().zip(&b.values).map(|(x, y)| x + y).collect();
            Ok(SignalValue::Series(Series::new(a.index.clone(), values)))
        }
    }

    #[test]
    fn multi_input_signal_orders_args_by_name() {
        let (mut registry, _) = setup();
        registry.register_computed("sum", Sum).unwrap();
        let expr = SignalExpr::new("sum")
            .with_arg("b", SignalExpr::new("candles").with_select("open"))
            .with_arg("a", close());
        let result = fetch_signal(&registry, &expr, &options(&["A"])).unwrap();
        assert_eq!(result["A"].name, "sum(a=candles[close],b=candles[open])");
        assert_eq!(result["A"].as_series().unwrap().values[0], 20.0);
    }
}
