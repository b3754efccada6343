//! Sports Prediction Engine
//!
//! Heuristic models for moneyline, spread, total and player prop markets,
//! calibrated against verified outcomes and combined into a weighted
//! ensemble.
//!
//! ## Architecture
//!
//! ```text
//! Store (odds, context, outcomes) → Models → Ensemble → Recommendation
//!          ↑                           ↑
//!   Elo updates                Calibration (accuracy, Brier, inversion, weights)
//!                                      ↑
//!                           Scheduler (periodic recomputation)
//!
//! Store (completed games) → Backtest (Elo replay, staking, metrics) → Store
//! ```

pub mod backtest;
pub mod calibration;
pub mod config;
pub mod elo;
pub mod error;
pub mod inverse;
pub mod model;
pub mod odds;
pub mod scheduler;
pub mod scoring;
pub mod storage;
pub mod types;

#[cfg(test)]
mod error_tests;
