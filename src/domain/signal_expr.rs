//! Signal expression tree.
//!
//! A `SignalExpr` names a signal by `id`, carries named arguments that are
//! either literal values or nested expressions, and optionally selects one
//! output field. Expressions are immutable values; the evaluator binds them
//! against a registry.
//!
//! Every expression has a canonical textual form, its *qualified id*:
//!
//! ```text
//! rsi<window=14>(base=candles_5min[close])
//! ```
//!
//! Literal arguments go in `<...>`, signal arguments in `(...)`, the selector
//! in `[...]`. Each group is omitted when empty. Arguments are ordered by name,
//! so equal trees always print the same string. The qualified id doubles as
//! the memoization key and the column name in signal sets.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Literal {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Ints widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Int(v) => Some(*v as f64),
            Literal::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::Text(_) => "text",
        }
    }

    /// Classify a bare token the same way the parser does.
    pub(crate) fn classify(token: &str) -> Literal {
        if let Ok(v) = token.parse::<i64>() {
            return Literal::Int(v);
        }
        let numeric_shape = token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
            && token.chars().any(|c| c.is_ascii_digit());
        if numeric_shape {
            if let Ok(v) = token.parse::<f64>() {
                return Literal::Float(v);
            }
        }
        match token {
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            // Non-finite floats, as `Display` prints them.
            "NaN" => Literal::Float(f64::NAN),
            "inf" => Literal::Float(f64::INFINITY),
            "-inf" => Literal::Float(f64::NEG_INFINITY),
            _ => Literal::Text(token.to_string()),
        }
    }

    pub(crate) fn is_bare_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | ':' | '/')
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            // Debug keeps the decimal point on whole floats (2.0, not 2).
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Text(v) => {
                let bare = !v.is_empty()
                    && v.chars().all(Literal::is_bare_char)
                    && matches!(Literal::classify(v), Literal::Text(_));
                if bare {
                    write!(f, "{v}")
                } else {
                    write!(f, "\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Literal),
    Signal(SignalExpr),
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Value(Literal::Int(v))
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Value(Literal::Int(i64::from(v)))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Value(Literal::Float(v))
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Value(Literal::Bool(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Value(Literal::Text(v.to_string()))
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Value(Literal::Text(v))
    }
}

impl From<Literal> for Arg {
    fn from(v: Literal) -> Self {
        Arg::Value(v)
    }
}

impl From<SignalExpr> for Arg {
    fn from(v: SignalExpr) -> Self {
        Arg::Signal(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalExpr {
    pub id: String,
    pub args: BTreeMap<String, Arg>,
    pub select: Option<String>,
}

impl SignalExpr {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: BTreeMap::new(),
            select: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_select(mut self, field: impl Into<String>) -> Self {
        self.select = Some(field.into());
        self
    }

    /// Same node without its output selector.
    pub fn without_select(&self) -> Self {
        Self {
            id: self.id.clone(),
            args: self.args.clone(),
            select: None,
        }
    }

    pub fn literal_args(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.args.iter().filter_map(|(k, v)| match v {
            Arg::Value(lit) => Some((k.as_str(), lit)),
            Arg::Signal(_) => None,
        })
    }

    pub fn signal_args(&self) -> impl Iterator<Item = (&str, &SignalExpr)> {
        self.args.iter().filter_map(|(k, v)| match v {
            Arg::Signal(expr) => Some((k.as_str(), expr)),
            Arg::Value(_) => None,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.signal_args().next().is_none()
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .signal_args()
            .map(|(_, child)| child.node_count())
            .sum::<usize>()
    }

    pub fn qualified_id(&self) -> String {
        let mut out = self.id.clone();

        let literals: Vec<String> = self
            .literal_args()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if !literals.is_empty() {
            out.push('<');
            out.push_str(&literals.join(","));
            out.push('>');
        }

        let signals: Vec<String> = self
            .signal_args()
            .map(|(k, v)| format!("{k}={}", v.qualified_id()))
            .collect();
        if !signals.is_empty() {
            out.push('(');
            out.push_str(&signals.join(","));
            out.push(')');
        }

        if let Some(field) = &self.select {
            out.push('[');
            out.push_str(field);
            out.push(']');
        }

        out
    }
}

impl fmt::Display for SignalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_id())
    }
}

impl std::str::FromStr for SignalExpr {
    type Err = crate::domain::error::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::domain::signal_parser::parse_expr(s)
    }
}

impl Serialize for SignalExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.qualified_id())
    }
}

impl<'de> Deserialize<'de> for SignalExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
