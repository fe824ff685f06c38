//! njord: signal-expression research and backtesting for stock data.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The command-line surface lives in
//! [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
