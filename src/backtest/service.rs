//! Store-backed backtest execution

use super::{BacktestRequest, BacktestResult, BacktestRun, BacktestSettings, ModelConfig};
use crate::elo::{EloConfig, EloUpdater};
use crate::error::Result;
use crate::storage::Store;
use std::sync::Arc;
use uuid::Uuid;

pub struct BacktestService {
    store: Arc<dyn Store>,
    settings: BacktestSettings,
    elo: EloConfig,
}

impl BacktestService {
    pub fn new(store: Arc<dyn Store>, settings: BacktestSettings, elo: EloConfig) -> Self {
        Self { store, settings, elo }
    }

    /// Run a backtest and persist it. Nothing is written unless the run completes.
    pub async fn run(&self, config: ModelConfig, request: BacktestRequest) -> Result<BacktestResult> {
        request.validate()?;
        let mut run = BacktestRun::new(config, self.settings.clone(), EloUpdater::new(self.elo.clone()))?;
        run.start()?;

        let sport = run.config().sport.clone();
        let games = match self
            .store
            .completed_games(&sport, request.start_date, request.end_date)
            .await
        {
            Ok(games) => games,
            Err(e) => {
                run.fail(format!("reading completed games: {}", e))?;
                return Err(e);
            }
        };

        let result = match run.evaluate(&request, &games) {
            Ok(result) => result,
            Err(e) => {
                run.fail(e.to_string())?;
                return Err(e);
            }
        };

        if let Err(e) = self.store.save_backtest_result(&result).await {
            run.fail(format!("saving result: {}", e))?;
            return Err(e);
        }
        run.complete()?;

        tracing::info!(
            "✅ Backtest {} complete: {} games, {} picks",
            result.id,
            games.len(),
            result.total_predictions
        );
        Ok(result)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BacktestResult>> {
        self.store.backtest_result(id).await
    }
}
