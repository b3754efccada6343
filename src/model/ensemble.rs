//! Ensemble model combining several models' opinions with calibration weights

use crate::inverse;
use crate::types::{AnalysisResult, OddsSnapshot, PropSnapshot, WeightSnapshot};
use crate::odds;

/// Name the combined pick is reported under
pub const ENSEMBLE_NAME: &str = "ensemble";

/// Combines opinions for one game and market using a [`WeightSnapshot`]
pub struct EnsembleModel {
    weights: WeightSnapshot,
}

struct Vote {
    analysis: AnalysisResult,
    weight: f64,
    /// Probability the vote assigns to its own label
    conviction: f64,
    inverted: bool,
}

impl EnsembleModel {
    pub fn new(weights: WeightSnapshot) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightSnapshot {
        &self.weights
    }

    /// Combine opinions on the same market.
    ///
    /// Models that abstained are simply absent from `analyses`, and "avoid"
    /// signals never vote since they back no side. Inverted
    /// models are flipped before voting and back the opposite label with
    /// their original confidence. Each vote contributes `weight * p(label)`
    /// where `p` is that confidence for the vote's label and `1 - confidence`
    /// for the other label. Returns `None` when
    /// nobody voted or the result is a coin flip.
    pub fn combine(
        &self,
        analyses: &[AnalysisResult],
        odds: Option<&OddsSnapshot>,
        prop: Option<&PropSnapshot>,
    ) -> Option<AnalysisResult> {
        let first = analyses.first()?;
        let neutral = 1.0 / analyses.len() as f64;

        let mut votes: Vec<Vote> = Vec::with_capacity(analyses.len());
        for analysis in analyses {
            if analysis.bet_type != first.bet_type || analysis.game_id != first.game_id {
                tracing::debug!(
                    "Ensemble skipping {} pick on a different market",
                    analysis.model_name
                );
                continue;
            }

            if analysis.is_avoid() {
                tracing::debug!("Ensemble skipping {} avoid signal", analysis.model_name);
                continue;
            }

            let record = self.weights.get(&analysis.model_name);
            let weight = record.map(|w| w.weight).unwrap_or(neutral);
            if weight <= 0.0 {
                continue;
            }

            if record.map(|w| w.inverted).unwrap_or(false) {
                let opposite = inverse::opposite_odds(analysis, odds, prop);
                // Flipped picks back the other side with the original conviction
                match inverse::invert(analysis, opposite) {
                    Some(flipped) => votes.push(Vote {
                        analysis: flipped,
                        weight,
                        conviction: analysis.confidence,
                        inverted: true,
                    }),
                    None => tracing::debug!(
                        "Ensemble dropping {}: inverted model with no invertible pick",
                        analysis.model_name
                    ),
                }
            } else {
                votes.push(Vote {
                    analysis: analysis.clone(),
                    weight,
                    conviction: analysis.confidence,
                    inverted: false,
                });
            }
        }

        if votes.is_empty() {
            return None;
        }

        let total_weight: f64 = votes.iter().map(|v| v.weight).sum();
        let mut labels: Vec<&str> = votes.iter().map(|v| v.analysis.prediction.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();

        let (label, score) = labels
            .iter()
            .map(|label| {
                let support: f64 = votes
                    .iter()
                    .map(|v| {
                        let p = if v.analysis.prediction == *label {
                            v.conviction
                        } else {
                            1.0 - v.conviction
                        };
                        v.weight * p
                    })
                    .sum();
                (*label, support / total_weight)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

        if score <= 0.5 {
            return None;
        }

        let best = votes
            .iter()
            .filter(|v| v.analysis.prediction == label)
            .max_by(|a, b| {
                odds::payout_multiplier(a.analysis.recommended_odds)
                    .partial_cmp(&odds::payout_multiplier(b.analysis.recommended_odds))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        let reasoning = votes
            .iter()
            .map(|v| {
                format!(
                    "{}{}: {} {:.0}% (w {:.2})",
                    v.analysis.model_name,
                    if v.inverted { " (inverted)" } else { "" },
                    v.analysis.prediction,
                    v.conviction * 100.0,
                    v.weight
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        Some(AnalysisResult {
            model_name: ENSEMBLE_NAME.to_string(),
            prediction: label.to_string(),
            confidence: score,
            reasoning: format!("Ensemble of {} models: {}", votes.len(), reasoning),
            ..best.analysis.clone()
        })
    }
}
