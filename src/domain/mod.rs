//! Core domain types and logic.

pub mod error;
pub mod instrument;
pub mod ohlc;
pub mod series;
pub mod series_store;
pub mod signal;
pub mod extremum;
pub mod scaling;
pub mod features;
pub mod predictor;
pub mod forecast;
pub mod portfolio;
pub mod backtest;
pub mod config;
