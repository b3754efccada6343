//! Periodic weight recomputation
//!
//! Each tick recomputes every configured (sport, bet_type) key concurrently.
//! Work for one key is serialized through [`KeyedLocks`] so an overlapping
//! manual run and a scheduled run never interleave their writes.

use crate::calibration::CalibrationService;
use crate::model::ALL_MODELS;
use crate::types::BetType;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One async mutex per (sport, bet_type)
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<(String, BetType), Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `key`, created on first use
    pub fn lock_for(&self, sport: &str, bet_type: BetType) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry((sport.to_string(), bet_type))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub sport: String,
    pub bet_type: BetType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub keys: Vec<ScheduleKey>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            keys: vec![
                ScheduleKey {
                    sport: "basketball_nba".to_string(),
                    bet_type: BetType::Moneyline,
                },
                ScheduleKey {
                    sport: "basketball_nba".to_string(),
                    bet_type: BetType::Spread,
                },
            ],
        }
    }
}

pub struct WeightScheduler {
    service: Arc<CalibrationService>,
    config: SchedulerConfig,
}

impl WeightScheduler {
    pub fn new(service: Arc<CalibrationService>, config: SchedulerConfig) -> Self {
        Self { service, config }
    }

    /// Recompute every key once. Returns how many keys succeeded.
    pub async fn run_once(&self) -> usize {
        let runs = self.config.keys.iter().map(|key| {
            let service = Arc::clone(&self.service);
            async move {
                match service
                    .recompute_weights(&key.sport, key.bet_type, ALL_MODELS, None)
                    .await
                {
                    Ok(weights) => {
                        tracing::debug!("{} {}: {} weights", key.sport, key.bet_type, weights.len());
                        true
                    }
                    Err(e) => {
                        tracing::error!(
                            "Weight recomputation failed for {} {}: {}",
                            key.sport,
                            key.bet_type,
                            e
                        );
                        false
                    }
                }
            }
        });

        join_all(runs).await.into_iter().filter(|ok| *ok).count()
    }

    /// Tick until ctrl-c
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        tracing::info!(
            "⏰ Weight scheduler started: {} keys every {}s",
            self.config.keys.len(),
            self.config.interval_secs
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let ok = self.run_once().await;
                    tracing::info!("Weight cycle complete: {}/{} keys", ok, self.config.keys.len());
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down weight scheduler");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationEngine;
    use crate::error::Error;
    use crate::storage::{MockStore, RecordStore};

    fn scheduler(store: Arc<dyn crate::storage::Store>) -> WeightScheduler {
        let service = CalibrationService::new(store, CalibrationEngine::default(), vec!["value".to_string()]);
        WeightScheduler::new(Arc::new(service), SchedulerConfig::default())
    }

    #[tokio::test]
    async fn test_run_once_counts_every_key() {
        let scheduler = scheduler(Arc::new(RecordStore::in_memory()));
        assert_eq!(scheduler.run_once().await, 2);
    }

    #[tokio::test]
    async fn test_run_once_reports_failed_keys() {
        let mut mock = MockStore::new();
        mock.expect_verified_analyses().returning(|_, _, bet_type, _| {
            if bet_type == BetType::Spread {
                Err(Error::StoreUnavailable("spread partition offline".to_string()))
            } else {
                Ok(Vec::new())
            }
        });
        mock.expect_replace_model_weights()
            .withf(|_, bet_type, _| *bet_type == BetType::Moneyline)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let scheduler = scheduler(Arc::new(mock));
        assert_eq!(scheduler.run_once().await, 1);
    }

    #[test]
    fn test_same_key_shares_lock() {
        let locks = KeyedLocks::new();
        let a = locks.lock_for("basketball_nba", BetType::Spread);
        let b = locks.lock_for("basketball_nba", BetType::Spread);
        let c = locks.lock_for("basketball_nba", BetType::Total);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let lock = locks.lock_for("basketball_nba", BetType::Moneyline);
        let _held = lock.lock().await;
        let again = locks.lock_for("basketball_nba", BetType::Moneyline);
        assert!(again.try_lock().is_err());
        let other = locks.lock_for("americanfootball_nfl", BetType::Moneyline);
        assert!(other.try_lock().is_ok());
    }
}
