//! Terminal metrics over a finished prediction series

use super::{BacktestPrediction, BetOutcome};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_predictions: usize,
    pub correct_predictions: usize,
    pub pushes: usize,
    pub accuracy: f64,
    pub roi: f64,
    pub bankroll_roi: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub final_bankroll: Decimal,
    pub total_wagered: Decimal,
    pub net_profit: Decimal,
}

impl Metrics {
    pub fn compute(predictions: &[BacktestPrediction], starting_bankroll: Decimal) -> Self {
        let pushes = predictions
            .iter()
            .filter(|p| p.outcome == BetOutcome::Push)
            .count();
        let total_predictions = predictions.len() - pushes;
        let correct_predictions = predictions
            .iter()
            .filter(|p| p.outcome == BetOutcome::Win)
            .count();

        let total_wagered: Decimal = predictions
            .iter()
            .filter(|p| p.outcome != BetOutcome::Push)
            .map(|p| p.stake)
            .sum();
        let net_profit: Decimal = predictions.iter().map(|p| p.profit).sum();
        let final_bankroll = starting_bankroll + net_profit;

        Self {
            total_predictions,
            correct_predictions,
            pushes,
            accuracy: ratio(correct_predictions as f64, total_predictions as f64),
            roi: ratio(to_f64(net_profit), to_f64(total_wagered)),
            bankroll_roi: ratio(to_f64(net_profit), to_f64(starting_bankroll)),
            sharpe_ratio: sharpe_ratio(predictions),
            max_drawdown: max_drawdown(starting_bankroll, predictions),
            final_bankroll,
            total_wagered,
            net_profit,
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Mean over sample standard deviation of per-bet returns (profit / stake)
pub fn sharpe_ratio(predictions: &[BacktestPrediction]) -> f64 {
    let returns: Vec<f64> = predictions
        .iter()
        .filter(|p| p.outcome != BetOutcome::Push && p.stake > Decimal::ZERO)
        .map(|p| to_f64(p.profit) / to_f64(p.stake))
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        0.0
    } else {
        mean / std_dev
    }
}

/// Largest peak-to-trough bankroll decline as a fraction of the peak
pub fn max_drawdown(starting_bankroll: Decimal, predictions: &[BacktestPrediction]) -> f64 {
    let mut peak = starting_bankroll;
    let mut max_dd = 0.0;

    for prediction in predictions {
        let bankroll = prediction.bankroll_after;
        if bankroll > peak {
            peak = bankroll;
        }
        if peak > Decimal::ZERO {
            let dd = to_f64((peak - bankroll) / peak);
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}
