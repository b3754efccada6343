//! American odds arithmetic
//!
//! - Implied probability and payout multiplier
//! - No-vig fair probability and bookmaker margin
//! - Expected ROI of a pick
//! - Fractional Kelly stake sizing in Decimal currency

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Standard price used when a real one was not recorded
pub const STANDARD_ODDS: i32 = -110;

/// Implied probability of American odds (includes the bookmaker's margin)
///
/// Positive odds (+150): 100 / (odds + 100)
/// Negative odds (-150): |odds| / (|odds| + 100)
pub fn implied_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else if odds < 0 {
        let abs = (odds as f64).abs();
        abs / (abs + 100.0)
    } else {
        0.5
    }
}

/// Profit per unit staked on a win
pub fn payout_multiplier(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64 / 100.0
    } else if odds < 0 {
        100.0 / (odds as f64).abs()
    } else {
        1.0
    }
}

/// Decimal version of [`payout_multiplier`] for currency math
pub fn payout_multiplier_decimal(odds: i32) -> Decimal {
    if odds > 0 {
        Decimal::from(odds) / dec!(100)
    } else if odds < 0 {
        dec!(100) / Decimal::from(odds.unsigned_abs())
    } else {
        Decimal::ONE
    }
}

/// Convert a probability to American odds (fair price, no margin)
pub fn probability_to_american(prob: f64) -> i32 {
    let prob = prob.clamp(0.01, 0.99);
    if prob >= 0.5 {
        -((prob / (1.0 - prob)) * 100.0).round() as i32
    } else {
        (((1.0 - prob) / prob) * 100.0).round() as i32
    }
}

/// Bookmaker margin ("vig") of a two-way market: sum of implied probabilities minus 1
pub fn bookmaker_margin(side_a: i32, side_b: i32) -> f64 {
    implied_probability(side_a) + implied_probability(side_b) - 1.0
}

/// Fair probability of `side_a` once the margin is removed
pub fn no_vig_probability(side_a: i32, side_b: i32) -> f64 {
    let a = implied_probability(side_a);
    let b = implied_probability(side_b);
    if a + b <= 0.0 {
        return 0.5;
    }
    a / (a + b)
}

/// Expected return per unit staked: p * payout - (1 - p)
pub fn expected_roi(confidence: f64, odds: i32) -> f64 {
    confidence * payout_multiplier(odds) - (1.0 - confidence)
}

/// Edge of a probability estimate over the market-implied probability
pub fn edge(confidence: f64, odds: i32) -> f64 {
    confidence - implied_probability(odds)
}

/// Full Kelly fraction: f* = (p * b - q) / b, never negative
pub fn kelly_fraction(confidence: f64, odds: i32) -> f64 {
    let b = payout_multiplier(odds);
    if b <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - confidence;
    ((confidence * b - q) / b).max(0.0)
}

/// Fractional Kelly stake in currency, capped at `max_pct` of bankroll
pub fn kelly_stake(
    bankroll: Decimal,
    confidence: f64,
    odds: i32,
    fraction: Decimal,
    max_pct: Decimal,
) -> Decimal {
    if bankroll <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let full_kelly = Decimal::from_f64(kelly_fraction(confidence, odds)).unwrap_or(Decimal::ZERO);
    if full_kelly <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let pct = (full_kelly * fraction).min(max_pct);
    (bankroll * pct).round_dp(2)
}

/// Net profit of a winning stake at the given odds, rounded to cents
pub fn win_profit(stake: Decimal, odds: i32) -> Decimal {
    (stake * payout_multiplier_decimal(odds)).round_dp(2)
}
