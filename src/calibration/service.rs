//! Store-backed calibration: accuracy lookups, confidence adjustment and
//! the weight recomputation job

use super::{CalibrationEngine, ModelPerformance};
use crate::error::{Error, Result};
use crate::model::ALL_MODELS;
use crate::scheduler::KeyedLocks;
use crate::storage::Store;
use crate::types::{AnalysisResult, BetType, ModelWeight};
use chrono::{Duration, Utc};
use futures_util::future::try_join_all;
use std::sync::Arc;

pub struct CalibrationService {
    store: Arc<dyn Store>,
    engine: CalibrationEngine,
    /// Models weights are normalized over
    models: Vec<String>,
    locks: KeyedLocks,
}

impl CalibrationService {
    pub fn new(store: Arc<dyn Store>, engine: CalibrationEngine, models: Vec<String>) -> Self {
        Self {
            store,
            engine,
            models,
            locks: KeyedLocks::new(),
        }
    }

    pub fn engine(&self) -> &CalibrationEngine {
        &self.engine
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn lookback(&self, lookback_days: Option<i64>) -> i64 {
        lookback_days.unwrap_or(self.engine.config().lookback_days).max(0)
    }

    /// Accuracy over the lookback window, `None` below the sample threshold
    pub async fn recent_accuracy(
        &self,
        model_name: &str,
        sport: &str,
        bet_type: BetType,
        lookback_days: Option<i64>,
    ) -> Result<Option<f64>> {
        let since = Utc::now() - Duration::days(self.lookback(lookback_days));
        let records = self
            .store
            .verified_analyses(model_name, sport, bet_type, since)
            .await?;
        Ok(self.engine.recent_accuracy(&records))
    }

    /// The analysis confidence scaled by its model's recent accuracy
    pub async fn adjusted_confidence(&self, analysis: &AnalysisResult) -> Result<f64> {
        let accuracy = self
            .recent_accuracy(&analysis.model_name, &analysis.sport, analysis.bet_type, None)
            .await?;
        Ok(self.engine.adjust_confidence(analysis.confidence, accuracy))
    }

    /// Track record of every configured model for one key
    pub async fn performances(
        &self,
        sport: &str,
        bet_type: BetType,
        lookback_days: Option<i64>,
    ) -> Result<Vec<ModelPerformance>> {
        let since = Utc::now() - Duration::days(self.lookback(lookback_days));
        let reads = self.models.iter().map(|name| {
            let store = Arc::clone(&self.store);
            async move {
                let records = store.verified_analyses(name, sport, bet_type, since).await?;
                Ok::<_, Error>(self.engine.performance(name, &records))
            }
        });
        try_join_all(reads).await
    }

    /// Recompute and persist weights for (sport, bet_type).
    ///
    /// Weights are always normalized over every configured model so the
    /// stored set keeps summing to 1; `selector` only narrows what is
    /// returned. The set is written in one replacement, so a failed write
    /// leaves the previous set intact and models no longer configured drop
    /// out. A store failure aborts the run. Runs for the same key are serialized.
    pub async fn recompute_weights(
        &self,
        sport: &str,
        bet_type: BetType,
        selector: &str,
        lookback_days: Option<i64>,
    ) -> Result<Vec<ModelWeight>> {
        let all = selector.eq_ignore_ascii_case(ALL_MODELS);
        if !all && !self.models.iter().any(|m| m == selector) {
            return Err(Error::UnknownModel(selector.to_string()));
        }

        let lock = self.locks.lock_for(sport, bet_type);
        let _guard = lock.lock().await;

        let performances = self.performances(sport, bet_type, lookback_days).await?;
        let weights = self
            .engine
            .compute_weights(sport, bet_type, &performances, Utc::now());

        self.store.replace_model_weights(sport, bet_type, &weights).await?;

        let inverted: Vec<&str> = weights
            .iter()
            .filter(|w| w.inverted)
            .map(|w| w.model_name.as_str())
            .collect();
        tracing::info!(
            "⚖️ Recomputed {} weights for {} {} (inverted: {:?})",
            weights.len(),
            sport,
            bet_type,
            inverted
        );

        Ok(weights
            .into_iter()
            .filter(|w| all || w.model_name == selector)
            .collect())
    }
}
