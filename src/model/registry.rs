//! Model registry: resolves a model name to a constructed instance

use super::{
    ConsensusModel, ContrarianModel, HotColdModel, InjuryAwareModel, MatchupModel, ModelSettings,
    MomentumModel, PredictionModel, RestScheduleModel, ValueModel,
};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Every registered model name
pub const MODEL_NAMES: [&str; 8] = [
    "consensus",
    "value",
    "momentum",
    "contrarian",
    "hot_cold",
    "rest_schedule",
    "matchup",
    "injury_aware",
];

/// Selector meaning every registered model
pub const ALL_MODELS: &str = "all";

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    settings: ModelSettings,
}

impl ModelRegistry {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    pub fn names(&self) -> &'static [&'static str] {
        &MODEL_NAMES
    }

    /// Construct a model by name. Unknown names are a configuration error.
    pub fn create(&self, name: &str) -> Result<Arc<dyn PredictionModel>> {
        let settings = self.settings.clone();
        let model: Arc<dyn PredictionModel> = match name {
            "consensus" => Arc::new(ConsensusModel::new(settings)),
            "value" => Arc::new(ValueModel::new(settings)),
            "momentum" => Arc::new(MomentumModel::new(settings)),
            "contrarian" => Arc::new(ContrarianModel::new(settings)),
            "hot_cold" => Arc::new(HotColdModel::new(settings)),
            "rest_schedule" => Arc::new(RestScheduleModel::new(settings)),
            "matchup" => Arc::new(MatchupModel::new(settings)),
            "injury_aware" => Arc::new(InjuryAwareModel::new(settings)),
            other => return Err(Error::UnknownModel(other.to_string())),
        };
        Ok(model)
    }

    /// Resolve `"all"` or a single model name
    pub fn resolve(&self, selector: &str) -> Result<Vec<Arc<dyn PredictionModel>>> {
        if selector.eq_ignore_ascii_case(ALL_MODELS) {
            return self.create_many(MODEL_NAMES.iter().copied());
        }
        Ok(vec![self.create(selector)?])
    }

    /// Construct every named model, failing on the first unknown name
    pub fn create_many<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Arc<dyn PredictionModel>>> {
        names.into_iter().map(|name| self.create(name)).collect()
    }
}
