//! # Model Layer
//!
//! Persistent entities and the storage layer behind them.

pub mod store;
