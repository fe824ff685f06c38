//! Signal registry: the capabilities an expression tree is bound against.
//!
//! Two kinds of entry exist. A [`Fetcher`] is a leaf: given literal arguments
//! and the symbols/time range of a request, it returns one raw frame per
//! symbol. A [`ComputedSignal`] is a composite: given resolved input signals
//! for one symbol and its literal arguments, it derives a new series or frame.
//! Both declare their parameters up front so expressions can be validated
//! before any data is touched.

use crate::domain::error::NjordError;
use crate::domain::interval::TimeRange;
use crate::domain::series::{Frame, Series};
use crate::domain::signal::{Signal, SignalValue};
use crate::domain::signal_expr::Literal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

pub type LiteralArgs = BTreeMap<String, Literal>;

/// What a fetch covers: which symbols, over which inclusive time range.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub symbols: BTreeSet<String>,
    pub range: TimeRange,
}

impl FetchOptions {
    pub fn new<I, S>(symbols: I, range: TimeRange) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Int { default: Option<i64> },
    Float { default: Option<f64> },
    Text { default: Option<&'static str> },
    Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int {
                default: Some(default),
            },
        }
    }

    pub const fn required_int(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Int { default: None },
        }
    }

    pub const fn float(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float {
                default: Some(default),
            },
        }
    }

    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text {
                default: Some(default),
            },
        }
    }

    pub const fn signal(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Signal,
        }
    }

    pub fn default_literal(&self) -> Option<Literal> {
        match &self.kind {
            ParamKind::Int { default } => default.map(Literal::Int),
            ParamKind::Float { default } => default.map(Literal::Float),
            ParamKind::Text { default } => default.map(|d| Literal::Text(d.to_string())),
            ParamKind::Signal => None,
        }
    }
}

/// Leaf capability: raw data per symbol.
pub trait Fetcher: Send + Sync {
    /// Literal parameters this fetcher accepts.
    fn params(&self) -> &[ParamSpec] {
        &[]
    }

    fn fetch(
        &self,
        args: &LiteralArgs,
        options: &FetchOptions,
    ) -> Result<BTreeMap<String, Frame>, NjordError>;
}

/// Composite capability: derive a signal for one symbol from its inputs.
pub trait ComputedSignal: Send + Sync {
    fn params(&self) -> &[ParamSpec];

    fn compute(&self, args: &ComputeArgs<'_>) -> Result<SignalValue, NjordError>;
}

/// Resolved arguments handed to [`ComputedSignal::compute`]. Literal defaults
/// are already filled in.
pub struct ComputeArgs<'a> {
    pub id: &'a str,
    pub literals: &'a LiteralArgs,
    pub inputs: BTreeMap<&'a str, &'a Signal>,
}

impl<'a> ComputeArgs<'a> {
    fn invalid(&self, arg: &str, reason: impl Into<String>) -> NjordError {
        NjordError::InvalidArgument {
            id: self.id.to_string(),
            arg: arg.to_string(),
            reason: reason.into(),
        }
    }

    fn literal(&self, name: &str) -> Result<&Literal, NjordError> {
        self.literals
            .get(name)
            .ok_or_else(|| self.invalid(name, "missing value"))
    }

    pub fn int(&self, name: &str) -> Result<i64, NjordError> {
        self.literal(name)?
            .as_int()
            .ok_or_else(|| self.invalid(name, "expected an integer"))
    }

    /// A strictly positive integer, as used for window lengths.
    pub fn window(&self, name: &str) -> Result<usize, NjordError> {
        let value = self.int(name)?;
        if value <= 0 {
            return Err(self.invalid(name, format!("must be positive, got {value}")));
        }
        usize::try_from(value).map_err(|_| self.invalid(name, "out of range"))
    }

    pub fn float(&self, name: &str) -> Result<f64, NjordError> {
        self.literal(name)?
            .as_float()
            .ok_or_else(|| self.invalid(name, "expected a number"))
    }

    pub fn text(&self, name: &str) -> Result<&str, NjordError> {
        self.literal(name)?
            .as_text()
            .ok_or_else(|| self.invalid(name, "expected text"))
    }

    pub fn input(&self, name: &str) -> Result<&'a Signal, NjordError> {
        self.inputs
            .get(name)
            .copied()
            .ok_or_else(|| self.invalid(name, "missing input signal"))
    }

    pub fn series(&self, name: &str) -> Result<&'a Series, NjordError> {
        self.input(name)?.as_series()
    }

    /// Named column of a frame-valued input.
    pub fn frame_column(&self, name: &str, column: &str) -> Result<&'a [f64], NjordError> {
        let signal = self.input(name)?;
        signal
            .as_frame()?
            .column(column)
            .ok_or_else(|| NjordError::InvalidSelect {
                signal: signal.name.clone(),
                field: column.to_string(),
                reason: format!("'{}' needs a frame with a '{}' column", self.id, column),
            })
    }

    pub fn index(&self, name: &str) -> Result<&'a [chrono::NaiveDateTime], NjordError> {
        Ok(self.input(name)?.value.index())
    }
}

#[derive(Clone)]
pub enum RegistryEntry {
    Fetcher(Arc<dyn Fetcher>),
    Computed(Arc<dyn ComputedSignal>),
}

#[derive(Clone, Default)]
pub struct SignalRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard indicator library. Fetchers still need
    /// to be registered by the caller.
    pub fn standard() -> Result<Self, NjordError> {
        let mut registry = Self::new();
        crate::domain::signal_library::register_standard(&mut registry)?;
        Ok(registry)
    }

    fn check_kind(&self, id: &str, fetcher: bool) -> Result<(), NjordError> {
        match self.entries.get(id) {
            Some(RegistryEntry::Computed(_)) if fetcher => Err(NjordError::DuplicateSignal {
                id: id.to_string(),
                kind: "computed signal",
            }),
            Some(RegistryEntry::Fetcher(_)) if !fetcher => Err(NjordError::DuplicateSignal {
                id: id.to_string(),
                kind: "fetcher",
            }),
            _ => Ok(()),
        }
    }

    /// Register a fetcher, replacing any fetcher of the same id.
    pub fn register_fetcher(
        &mut self,
        id: impl Into<String>,
        fetcher: impl Fetcher + 'static,
    ) -> Result<(), NjordError> {
        let id = id.into();
        self.check_kind(&id, true)?;
        self.entries.insert(id, RegistryEntry::Fetcher(Arc::new(fetcher)));
        Ok(())
    }

    /// Register a computed signal, replacing any computed signal of the same id.
    pub fn register_computed(
        &mut self,
        id: impl Into<String>,
        signal: impl ComputedSignal + 'static,
    ) -> Result<(), NjordError> {
        let id = id.into();
        self.check_kind(&id, false)?;
        self.entries.insert(id, RegistryEntry::Computed(Arc::new(signal)));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    pub fn fetcher(&self, id: &str) -> Option<Arc<dyn Fetcher>> {
        match self.entries.get(id) {
            Some(RegistryEntry::Fetcher(f)) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn computed(&self, id: &str) -> Option<Arc<dyn ComputedSignal>> {
        match self.entries.get(id) {
            Some(RegistryEntry::Computed(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// All registered ids with their parameter lists, sorted by id.
    pub fn describe(&self) -> Vec<(String, bool, Vec<ParamSpec>)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|(id, entry)| match entry {
                RegistryEntry::Fetcher(f) => (id.clone(), true, f.params().to_vec()),
                RegistryEntry::Computed(c) => (id.clone(), false, c.params().to_vec()),
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
