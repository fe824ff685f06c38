//! Ready-made feature and label sets.

use crate::domain::signal_expr::SignalExpr;

fn field(leaf: &str, name: &str) -> SignalExpr {
    SignalExpr::new(leaf).with_select(name)
}

fn on(id: &str, base: &SignalExpr) -> SignalExpr {
    SignalExpr::new(id).with_arg("base", base.clone())
}

fn windowed(id: &str, window: i64, base: &SignalExpr) -> SignalExpr {
    on(id, base).with_arg("window", window)
}

/// The technical feature set: momentum, volatility and trend indicators on
/// close (or high/low/close where needed), plus look-back percent changes.
pub fn technical_features(leaf: &str) -> Vec<SignalExpr> {
    let candles = SignalExpr::new(leaf);
    let close = field(leaf, "close");
    let mut features = vec![close.clone(), field(leaf, "volume")];

    for window in [14, 30, 60, 120, 240] {
        features.push(windowed("rsi", window, &close));
    }
    for window in [10, 60, 120, 240] {
        features.push(windowed("kama", window, &close));
    }
    features.push(on("percent_price_osc", &close).with_select("ppo"));
    for window in [14, 30, 60, 120] {
        features.push(windowed("ema", window, &close));
    }

    for window in [14, 60, 120] {
        features.push(windowed("avg_true_range", window, &candles));
    }
    features.push(on("bollinger", &close).with_select("wband"));
    for window in [40, 20] {
        for band in ["hband", "pband", "wband"] {
            features.push(windowed("donchian", window, &candles).with_select(band));
        }
    }
    for window in [14, 40, 80, 120] {
        features.push(windowed("ulcer_index", window, &close));
    }

    for window in [14, 30] {
        for part in ["adx", "adx_neg", "adx_pos"] {
            features.push(windowed("adx", window, &candles).with_select(part));
        }
    }
    for part in ["aroon_down", "aroon_indicator", "aroon_up"] {
        features.push(on("aroon", &close).with_select(part));
    }
    features.push(on("cci", &candles));
    for part in ["kst", "kst_diff", "kst_sig"] {
        features.push(on("kst", &close).with_select(part));
    }
    for part in ["macd", "macd_diff", "macd_signal"] {
        features.push(on("macd", &close).with_select(part));
    }

    for days in [1, 2, 3, 4, 5, 7, 14, 30, 60, 120, 240, 480] {
        features.push(windowed("percent_change", -days, &close));
    }
    features
}

/// Forward percent change of close over `window` bars.
pub fn price_change_label(leaf: &str, window: i64) -> SignalExpr {
    windowed("percent_change", window, &field(leaf, "close"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluator::bind;
    use crate::domain::registry::SignalRegistry;
    use crate::domain::fetchers::MemoryFetcher;
    use std::collections::BTreeSet;

    #[test]
    fn technical_features_are_unique_and_bind() {
        let features = technical_features("candles_1day");
        let ids: BTreeSet<String> = features.iter().map(|f| f.qualified_id()).collect();
        assert_eq!(ids.len(), features.len());

        let mut registry = SignalRegistry::standard().unwrap();
        registry
            .register_fetcher("candles_1day", MemoryFetcher::default())
            .unwrap();
        for feature in &features {
            bind(feature, &registry).unwrap();
        }
    }

    #[test]
    fn label_id() {
        assert_eq!(
            price_change_label("candles", 5).qualified_id(),
            "percent_change<window=5>(base=candles[close])"
        );
    }
}
