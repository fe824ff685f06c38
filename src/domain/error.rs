//! Domain error types.

/// A parse error with position information for signal expressions and
/// interval strings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for njord.
#[derive(Debug, thiserror::Error)]
pub enum NjordError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ExprParse(#[from] ParseError),

    #[error("unknown signal '{id}'")]
    UnknownSignal { id: String },

    #[error("invalid argument '{arg}' for signal '{id}': {reason}")]
    InvalidArgument {
        id: String,
        arg: String,
        reason: String,
    },

    #[error("signal '{id}' is already registered as a {kind}")]
    DuplicateSignal { id: String, kind: &'static str },

    #[error("cannot select '{field}' from '{signal}': {reason}")]
    InvalidSelect {
        signal: String,
        field: String,
        reason: String,
    },

    #[error("signal set requires at least one feature signal")]
    NoFeatures,

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {rows} rows, need {minimum}")]
    InsufficientData {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("model error: {reason}")]
    Model { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&NjordError> for std::process::ExitCode {
    fn from(err: &NjordError) -> Self {
        let code: u8 = match err {
            NjordError::Io(_) | NjordError::Json(_) => 1,
            NjordError::ConfigParse { .. }
            | NjordError::ConfigMissing { .. }
            | NjordError::ConfigInvalid { .. } => 2,
            NjordError::Database { .. } | NjordError::DatabaseQuery { .. } => 3,
            NjordError::ExprParse(_)
            | NjordError::UnknownSignal { .. }
            | NjordError::DuplicateSignal { .. }
            | NjordError::InvalidArgument { .. }
            | NjordError::InvalidSelect { .. }
            | NjordError::NoFeatures => 4,
            NjordError::NoData { .. } | NjordError::InsufficientData { .. } => 5,
            NjordError::Model { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("rsi(base");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "rsi(base");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("expected ')'"));
    }

    #[test]
    fn unknown_signal_message_names_id() {
        let err = NjordError::UnknownSignal { id: "foo".into() };
        assert_eq!(err.to_string(), "unknown signal 'foo'");
    }
}
