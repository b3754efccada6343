//! Confidence calibration and dynamic weighting
//!
//! Turns a model's verified track record into:
//! - Recent accuracy and Brier score
//! - An inversion decision (is the raw signal anti-correlated with truth?)
//! - A normalized ensemble weight
//! - An adjusted confidence for surfacing a single model's pick

mod service;

pub use service::CalibrationService;

use crate::inverse;
use crate::types::{BetType, ModelWeight, VerifiedAnalysis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calibration tuning. The curve breakpoints are tunable constants; the
/// inversion floor and the confidence curve pivot need not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub lookback_days: i64,
    /// Verified records needed before accuracy is reported
    pub min_samples: usize,
    pub accuracy_weight: f64,
    pub brier_weight: f64,
    /// Inverse accuracy must exceed this for a model to be inverted
    pub inversion_floor: f64,
    /// Accuracy above which confidence is boosted
    pub boost_threshold: f64,
    /// (accuracy, multiplier) knots for accuracy above the threshold
    pub boost_curve: Vec<[f64; 2]>,
    /// (accuracy, multiplier) knots for accuracy at or below the threshold
    pub penalty_curve: Vec<[f64; 2]>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            min_samples: 5,
            accuracy_weight: 0.7,
            brier_weight: 0.3,
            inversion_floor: 0.5,
            boost_threshold: 0.6,
            boost_curve: vec![[0.6, 1.0], [0.7, 1.05], [0.8, 1.2]],
            penalty_curve: vec![[0.3, 0.5], [0.6, 0.95]],
        }
    }
}

/// A model's track record over the lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub model_name: String,
    pub sample_size: usize,
    pub correct: usize,
    /// `None` below the sample threshold
    pub accuracy: Option<f64>,
    pub brier_score: Option<f64>,
    pub inverse_accuracy: Option<f64>,
    pub inverse_brier_score: Option<f64>,
    pub inverted: bool,
}

impl ModelPerformance {
    pub fn has_sufficient_data(&self) -> bool {
        self.accuracy.is_some() && self.brier_score.is_some()
    }

    /// Accuracy and Brier score of the signal the ensemble will actually use
    pub fn effective(&self) -> Option<(f64, f64)> {
        if self.inverted {
            Some((self.inverse_accuracy?, self.inverse_brier_score?))
        } else {
            Some((self.accuracy?, self.brier_score?))
        }
    }
}

/// Mean squared error between stated confidence and the 0/1 outcome
pub fn brier_score(pairs: impl IntoIterator<Item = (f64, bool)>) -> Option<f64> {
    let (sum, count) = pairs.into_iter().fold((0.0, 0usize), |(sum, count), (p, hit)| {
        let outcome = if hit { 1.0 } else { 0.0 };
        (sum + (p - outcome).powi(2), count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Piecewise-linear interpolation over (x, y) knots, flat beyond the ends
fn interpolate(knots: &[[f64; 2]], x: f64) -> f64 {
    let (Some(first), Some(last)) = (knots.first(), knots.last()) else {
        return 1.0;
    };
    if x <= first[0] {
        return first[1];
    }
    if x >= last[0] {
        return last[1];
    }
    for pair in knots.windows(2) {
        let [x0, y0] = pair[0];
        let [x1, y1] = pair[1];
        if x >= x0 && x <= x1 {
            if x1 == x0 {
                return y1;
            }
            return y0 + (x - x0) / (x1 - x0) * (y1 - y0);
        }
    }
    last[1]
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// correct / total, or `None` below the sample threshold
    pub fn recent_accuracy(&self, records: &[VerifiedAnalysis]) -> Option<f64> {
        if records.is_empty() || records.len() < self.config.min_samples {
            return None;
        }
        let correct = records.iter().filter(|r| r.analysis_correct).count();
        Some(correct as f64 / records.len() as f64)
    }

    pub fn brier_score(&self, records: &[VerifiedAnalysis]) -> Option<f64> {
        if records.is_empty() || records.len() < self.config.min_samples {
            return None;
        }
        brier_score(records.iter().map(|r| (r.analysis.confidence, r.analysis_correct)))
    }

    /// Accuracy the inverse of every invertible pick would have had. A push
    /// loses both ways. Picks with no opposite side (e.g. "avoid" signals)
    /// are left out of the denominator.
    pub fn inverse_accuracy(&self, records: &[VerifiedAnalysis]) -> Option<f64> {
        let invertible = Self::invertible(records);
        if invertible.is_empty() || invertible.len() < self.config.min_samples {
            return None;
        }
        let correct = invertible.iter().filter(|r| Self::inverse_correct(r)).count();
        Some(correct as f64 / invertible.len() as f64)
    }

    pub fn inverse_brier_score(&self, records: &[VerifiedAnalysis]) -> Option<f64> {
        let invertible = Self::invertible(records);
        if invertible.is_empty() || invertible.len() < self.config.min_samples {
            return None;
        }
        brier_score(
            invertible
                .iter()
                .map(|r| (1.0 - r.analysis.confidence, Self::inverse_correct(r))),
        )
    }

    fn invertible(records: &[VerifiedAnalysis]) -> Vec<&VerifiedAnalysis> {
        records
            .iter()
            .filter(|r| inverse::opposite_prediction(&r.analysis).is_some())
            .collect()
    }

    fn inverse_correct(record: &VerifiedAnalysis) -> bool {
        !record.analysis_correct && !record.is_push()
    }

    /// Invert when the flipped signal beats the raw one and is itself better than a coin flip
    pub fn should_invert(&self, accuracy: Option<f64>, inverse_accuracy: Option<f64>) -> bool {
        match (accuracy, inverse_accuracy) {
            (Some(original), Some(inverse)) => {
                inverse > original && inverse > self.config.inversion_floor
            }
            _ => false,
        }
    }

    pub fn performance(&self, model_name: &str, records: &[VerifiedAnalysis]) -> ModelPerformance {
        let accuracy = self.recent_accuracy(records);
        let inverse_accuracy = self.inverse_accuracy(records);
        ModelPerformance {
            model_name: model_name.to_string(),
            sample_size: records.len(),
            correct: records.iter().filter(|r| r.analysis_correct).count(),
            accuracy,
            brier_score: self.brier_score(records),
            inverse_accuracy,
            inverse_brier_score: self.inverse_brier_score(records),
            inverted: self.should_invert(accuracy, inverse_accuracy),
        }
    }

    /// 0.7 * accuracy + 0.3 * (1 - Brier) on the signal actually used
    pub fn combined_score(&self, performance: &ModelPerformance) -> Option<f64> {
        let (accuracy, brier) = performance.effective()?;
        let score = self.config.accuracy_weight * accuracy + self.config.brier_weight * (1.0 - brier);
        Some(score.max(0.0))
    }

    /// Normalized weights for one (sport, bet_type).
    ///
    /// With `n` models of which `k` have enough data, the `k` share a mass of
    /// `k / n` in proportion to their combined score and every other model
    /// gets the neutral share `1 / n`. Weights are non-negative and sum to 1.
    pub fn compute_weights(
        &self,
        sport: &str,
        bet_type: BetType,
        performances: &[ModelPerformance],
        computed_at: DateTime<Utc>,
    ) -> Vec<ModelWeight> {
        if performances.is_empty() {
            return Vec::new();
        }

        let n = performances.len() as f64;
        let neutral = 1.0 / n;
        let scores: Vec<Option<f64>> = performances.iter().map(|p| self.combined_score(p)).collect();
        let sufficient = scores.iter().filter(|s| s.is_some()).count() as f64;
        let total: f64 = scores.iter().flatten().sum();
        let mass = sufficient / n;

        performances
            .iter()
            .zip(scores)
            .map(|(performance, score)| {
                let weight = match score {
                    Some(score) if total > 0.0 => mass * score / total,
                    _ => neutral,
                };
                ModelWeight {
                    model_name: performance.model_name.clone(),
                    sport: sport.to_string(),
                    bet_type,
                    weight,
                    inverted: performance.inverted,
                    accuracy: performance.accuracy,
                    brier_score: performance.brier_score,
                    sample_size: performance.sample_size,
                    computed_at,
                }
            })
            .collect()
    }

    /// Multiplier applied to a base confidence given recent accuracy
    pub fn confidence_multiplier(&self, accuracy: f64) -> f64 {
        if accuracy > self.config.boost_threshold {
            interpolate(&self.config.boost_curve, accuracy)
        } else {
            interpolate(&self.config.penalty_curve, accuracy)
        }
    }

    /// Scale a confidence by recent accuracy, never exceeding 1.0.
    /// Without enough history the base confidence is returned unchanged.
    pub fn adjust_confidence(&self, base: f64, accuracy: Option<f64>) -> f64 {
        match accuracy {
            Some(accuracy) => (base * self.confidence_multiplier(accuracy)).min(1.0),
            None => base,
        }
    }
}
