//! Sports Prediction Engine
//!
//! Command-line entry point: weight recomputation, game scoring,
//! backtesting, Elo updates and data import against the local store.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sports_predictor::{
    backtest::{BacktestRequest, BacktestService, ModelConfig},
    calibration::{CalibrationEngine, CalibrationService},
    config::Config,
    elo::EloUpdater,
    model::ALL_MODELS,
    scheduler::WeightScheduler,
    scoring::ScoringService,
    storage::{Dataset, RecordStore, SqliteTable, Store},
    types::{BetType, GameResult},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sports-predictor")]
#[command(about = "Calibrated sports prediction models, ensemble scoring and backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute model weights for a sport and bet type
    Weights {
        #[arg(long, default_value = "basketball_nba")]
        sport: String,
        #[arg(long, default_value = "moneyline")]
        bet_type: BetType,
        /// Model name or "all"
        #[arg(long, default_value = ALL_MODELS)]
        model: String,
        /// Override the configured lookback window
        #[arg(long)]
        lookback_days: Option<i64>,
    },
    /// Show a model's recent accuracy
    Accuracy {
        model: String,
        #[arg(long, default_value = "basketball_nba")]
        sport: String,
        #[arg(long, default_value = "moneyline")]
        bet_type: BetType,
        #[arg(long)]
        lookback_days: Option<i64>,
    },
    /// Score games and print ensemble recommendations
    Analyze {
        /// Game IDs to score
        #[arg(required = true)]
        game_ids: Vec<String>,
    },
    /// Run a backtest from a JSON model configuration
    Backtest {
        /// Path to the model configuration (JSON)
        model_config: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "local")]
        user_id: String,
        /// Identifier recorded with the result; defaults to the config name
        #[arg(long)]
        model_id: Option<String>,
    },
    /// Print a stored backtest result
    ShowBacktest { id: Uuid },
    /// Record a final score and update both teams' Elo ratings
    EloUpdate {
        #[arg(long, default_value = "basketball_nba")]
        sport: String,
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long)]
        home_score: u32,
        #[arg(long)]
        away_score: u32,
    },
    /// Import a JSON dataset into the store
    Import { path: String },
    /// Recompute weights on the configured interval until ctrl-c
    Schedule {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .init();

    let store = Arc::new(
        RecordStore::sqlite(&config.database.expanded_path(), config.database.max_connections)
            .await
            .context("opening store")?,
    );

    let outcome = match cli.command {
        Commands::Weights {
            sport,
            bet_type,
            model,
            lookback_days,
        } => recompute_weights(&config, store.clone(), &sport, bet_type, &model, lookback_days).await,
        Commands::Accuracy {
            model,
            sport,
            bet_type,
            lookback_days,
        } => show_accuracy(&config, store.clone(), &model, &sport, bet_type, lookback_days).await,
        Commands::Analyze { game_ids } => analyze(&config, store.clone(), &game_ids).await,
        Commands::Backtest {
            model_config,
            start,
            end,
            user_id,
            model_id,
        } => run_backtest(&config, store.clone(), &model_config, start, end, user_id, model_id).await,
        Commands::ShowBacktest { id } => show_backtest(&config, store.clone(), id).await,
        Commands::EloUpdate {
            sport,
            home,
            away,
            home_score,
            away_score,
        } => elo_update(&config, store.clone(), &sport, &home, &away, home_score, away_score).await,
        Commands::Import { path } => import(&store, &path).await,
        Commands::Schedule { once } => schedule(&config, store.clone(), once).await,
    };

    store.table().close().await;
    if let Err(e) = &outcome {
        tracing::error!("{:#}", e);
    }
    outcome
}

fn calibration_service(config: &Config, store: Arc<dyn Store>) -> CalibrationService {
    CalibrationService::new(
        store,
        CalibrationEngine::new(config.calibration.clone()),
        config.models.enabled.clone(),
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn recompute_weights(
    config: &Config,
    store: Arc<dyn Store>,
    sport: &str,
    bet_type: BetType,
    model: &str,
    lookback_days: Option<i64>,
) -> anyhow::Result<()> {
    let service = calibration_service(config, store);
    let weights = service
        .recompute_weights(sport, bet_type, model, lookback_days)
        .await?;
    print_json(&weights)
}

async fn show_accuracy(
    config: &Config,
    store: Arc<dyn Store>,
    model: &str,
    sport: &str,
    bet_type: BetType,
    lookback_days: Option<i64>,
) -> anyhow::Result<()> {
    let service = calibration_service(config, store);
    match service.recent_accuracy(model, sport, bet_type, lookback_days).await? {
        Some(accuracy) => println!("{} {} {}: {:.1}%", model, sport, bet_type, accuracy * 100.0),
        None => println!("{} {} {}: not enough verified picks", model, sport, bet_type),
    }
    Ok(())
}

async fn analyze(config: &Config, store: Arc<dyn Store>, game_ids: &[String]) -> anyhow::Result<()> {
    let registry = config.models.registry();
    let models = registry.create_many(config.models.enabled.iter().map(String::as_str))?;
    let service = ScoringService::new(store, models, config.scoring.clone());

    let analyses = service.analyze_games(game_ids).await;
    print_json(&analyses)
}

async fn run_backtest(
    config: &Config,
    store: Arc<dyn Store>,
    model_config: &str,
    start: NaiveDate,
    end: NaiveDate,
    user_id: String,
    model_id: Option<String>,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(model_config)
        .await
        .with_context(|| format!("reading {}", model_config))?;
    let model: ModelConfig = serde_json::from_str(&raw).with_context(|| format!("parsing {}", model_config))?;

    let request = BacktestRequest {
        user_id,
        model_id: model_id.unwrap_or_else(|| model.name.clone()),
        start_date: start,
        end_date: end,
    };
    let service = BacktestService::new(store, config.backtest.clone(), config.elo.clone());
    let result = service.run(model, request).await?;
    print_json(&result)
}

async fn show_backtest(config: &Config, store: Arc<dyn Store>, id: Uuid) -> anyhow::Result<()> {
    let service = BacktestService::new(store, config.backtest.clone(), config.elo.clone());
    match service.get(id).await? {
        Some(result) => print_json(&result),
        None => anyhow::bail!("no backtest with id {}", id),
    }
}

async fn elo_update(
    config: &Config,
    store: Arc<dyn Store>,
    sport: &str,
    home: &str,
    away: &str,
    home_score: u32,
    away_score: u32,
) -> anyhow::Result<()> {
    let result = if home_score > away_score {
        GameResult::HomeWin
    } else if away_score > home_score {
        GameResult::AwayWin
    } else {
        GameResult::Tie
    };
    let elo = EloUpdater::new(config.elo.clone());
    let update = elo
        .apply_result(store.as_ref(), sport, home, away, result, Utc::now())
        .await?;
    print_json(&update)
}

async fn import(store: &RecordStore<SqliteTable>, path: &str) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path))?;
    let dataset: Dataset = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
    let summary = store.import(&dataset).await?;
    print_json(&summary)
}

async fn schedule(config: &Config, store: Arc<dyn Store>, once: bool) -> anyhow::Result<()> {
    let service = Arc::new(calibration_service(config, store));
    let scheduler = WeightScheduler::new(service, config.scheduler.clone());
    if once {
        let ok = scheduler.run_once().await;
        let total = config.scheduler.keys.len();
        println!("{}/{} keys recomputed", ok, total);
        if ok < total {
            anyhow::bail!("{} of {} keys failed to recompute", total - ok, total);
        }
    } else {
        scheduler.run().await;
    }
    Ok(())
}
