//! Trend signal handling.
//!
//! Raw trend signals come from upstream and are never trusted on a single
//! observation: a value only drives allocation once it has persisted for a
//! full confirmation window.

pub mod confirm;

pub use confirm::{SignalConfirmer, DEFAULT_CONFIRMATION_WINDOW};
