//! Tests for model module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::Error;
    use crate::types::{
        BookmakerLine, GameRecord, HeadToHeadRecord, InjuryReport, InjuryStatus, ModelWeight, PropLine,
        ScheduleInfo, WeightSnapshot,
    };
    use chrono::{Duration, NaiveDate, Utc};

    const GAME: &str = "nba-lal-mem";

    fn moneyline(book: &str, home: i32, away: i32) -> BookmakerLine {
        BookmakerLine {
            bookmaker: book.to_string(),
            home_price: Some(home),
            away_price: Some(away),
            ..Default::default()
        }
    }

    fn spread(book: &str, home_spread: f64) -> BookmakerLine {
        BookmakerLine {
            bookmaker: book.to_string(),
            home_spread: Some(home_spread),
            home_spread_price: Some(-110),
            away_spread_price: Some(-110),
            ..Default::default()
        }
    }

    fn create_test_snapshot(bookmakers: Vec<BookmakerLine>) -> OddsSnapshot {
        OddsSnapshot {
            game_id: GAME.to_string(),
            sport: "basketball_nba".to_string(),
            home_team: "Lakers".to_string(),
            away_team: "Grizzlies".to_string(),
            commence_time: Utc::now() + Duration::hours(6),
            captured_at: Utc::now(),
            bookmakers,
        }
    }

    fn create_test_prop(lines: &[(f64, i32, i32)]) -> PropSnapshot {
        PropSnapshot {
            game_id: GAME.to_string(),
            sport: "basketball_nba".to_string(),
            player_name: "LeBron James".to_string(),
            team: Some("Lakers".to_string()),
            market_key: "player_points".to_string(),
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, (line, over, under))| PropLine {
                    bookmaker: format!("book{}", i),
                    line: *line,
                    over_price: *over,
                    under_price: *under,
                })
                .collect(),
            previous_line: None,
            recent_values: Vec::new(),
            opponent_allowed_avg: None,
            rest_days: None,
            injury_status: None,
            captured_at: Utc::now(),
        }
    }

    fn record(team: &str, points_for: u32, points_against: u32, days_ago: i64) -> GameRecord {
        GameRecord {
            game_id: format!("{}-{}", team, days_ago),
            team: team.to_string(),
            opponent: "Opponent".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() - Duration::days(days_ago),
            points_for,
            points_against,
            home: days_ago % 2 == 0,
        }
    }

    fn meeting(home_score: u32, away_score: u32) -> HeadToHeadRecord {
        HeadToHeadRecord {
            date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            home_team: "Lakers".to_string(),
            away_team: "Grizzlies".to_string(),
            home_score,
            away_score,
        }
    }

    fn pick(model: &str, prediction: &str, confidence: f64, odds: i32) -> AnalysisResult {
        AnalysisResult {
            game_id: GAME.to_string(),
            sport: "basketball_nba".to_string(),
            model_name: model.to_string(),
            analysis_type: AnalysisType::Game,
            bet_type: BetType::Moneyline,
            prediction: prediction.to_string(),
            confidence,
            reasoning: "test".to_string(),
            recommended_odds: odds,
            home_team: Some("Lakers".to_string()),
            away_team: Some("Grizzlies".to_string()),
            player_name: None,
            market_key: None,
            bookmaker: None,
        }
    }

    fn weight(model: &str, weight: f64, inverted: bool) -> ModelWeight {
        ModelWeight {
            model_name: model.to_string(),
            sport: "basketball_nba".to_string(),
            bet_type: BetType::Moneyline,
            weight,
            inverted,
            accuracy: None,
            brier_score: None,
            sample_size: 0,
            computed_at: Utc::now(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ==================== Settings ====================

    #[test]
    fn test_settings_bound_and_scale() {
        let settings = ModelSettings::default();
        assert_eq!(settings.bound(0.2), 0.5);
        assert_eq!(settings.bound(0.99), 0.85);
        assert!(approx(settings.scale(0.5, 0.55, 0.80), 0.675));
        assert!(approx(settings.scale(3.0, 0.55, 0.80), 0.80));
    }

    // ==================== Consensus ====================

    #[test]
    fn test_consensus_unanimous_spread() {
        let model = ConsensusModel::default();
        let odds = vec![create_test_snapshot(vec![
            spread("a", -3.5),
            spread("b", -3.5),
            spread("c", -3.5),
            spread("d", -3.5),
        ])];

        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        assert_eq!(result.bet_type, BetType::Spread);
        assert_eq!(result.prediction, "Lakers -3.5");
        assert!(approx(result.confidence, 0.70));
        assert_eq!(result.recommended_odds, -110);
    }

    #[test]
    fn test_consensus_elo_cross_check() {
        let model = ConsensusModel::default();
        let odds = vec![create_test_snapshot(vec![spread("a", -3.5), spread("b", -3.0), spread("c", -4.0)])];

        let agrees = GameContext {
            home_rating: Some(1600.0),
            away_rating: Some(1500.0),
            ..Default::default()
        };
        let disagrees = GameContext {
            home_rating: Some(1450.0),
            away_rating: Some(1550.0),
            ..Default::default()
        };
        let up = model.evaluate_game(GAME, &odds, &agrees).unwrap();
        let down = model.evaluate_game(GAME, &odds, &disagrees).unwrap();
        assert!(approx(up.confidence, 0.75));
        assert!(approx(down.confidence, 0.65));
    }

    #[test]
    fn test_consensus_abstains_without_books() {
        let model = ConsensusModel::default();
        let odds = vec![create_test_snapshot(vec![spread("a", -3.5), spread("b", -3.5)])];
        assert!(model.evaluate_game(GAME, &odds, &GameContext::default()).is_none());
        assert!(model.evaluate_game(GAME, &[], &GameContext::default()).is_none());

        // Two against two is no agreement
        let split = vec![create_test_snapshot(vec![
            spread("a", -1.5),
            spread("b", -1.5),
            spread("c", 1.5),
            spread("d", 1.5),
        ])];
        assert!(model.evaluate_game(GAME, &split, &GameContext::default()).is_none());
    }

    // ==================== Value ====================

    #[test]
    fn test_value_efficient_market_follows_fair_favorite() {
        let model = ValueModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -150, 140), moneyline("b", -145, 135)])];
        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(result.confidence > 0.55 && result.confidence < 0.6);
        assert_eq!(result.recommended_odds, -145);
        assert_eq!(result.bookmaker.as_deref(), Some("b"));
    }

    #[test]
    fn test_value_fat_margin_clear_favorite() {
        let model = ValueModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -300, 200)])];
        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        let margin = 0.75 + 1.0 / 3.0 - 1.0;
        let fair = 0.75 / (1.0 + margin);
        assert!(approx(result.confidence, fair - margin / 2.0));
        assert!(result.reasoning.contains("exploitable"));
    }

    #[test]
    fn test_value_abstains_in_middle_band() {
        let model = ValueModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -115, -105)])];
        assert!(model.evaluate_game(GAME, &odds, &GameContext::default()).is_none());

        let no_moneyline = vec![create_test_snapshot(vec![spread("a", -2.5)])];
        assert!(model.evaluate_game(GAME, &no_moneyline, &GameContext::default()).is_none());
    }

    // ==================== Momentum ====================

    #[test]
    fn test_momentum_needs_history() {
        let model = MomentumModel::default();
        let odds = vec![create_test_snapshot(vec![spread("a", -4.0)])];
        assert!(model.evaluate_game(GAME, &odds, &GameContext::default()).is_none());
    }

    #[test]
    fn test_momentum_follows_spread_move() {
        let model = MomentumModel::default();
        // Most recent first: line moved from -2 to -4 on the home side
        let odds = vec![
            create_test_snapshot(vec![spread("a", -4.0)]),
            create_test_snapshot(vec![spread("a", -2.0)]),
        ];
        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        assert_eq!(result.prediction, "Lakers -4");
        assert!(approx(result.confidence, 0.675));
    }

    #[test]
    fn test_momentum_prop_line_move() {
        let model = MomentumModel::default();
        let mut prop = create_test_prop(&[(24.5, -110, -110)]);
        assert!(model.evaluate_prop(&prop).is_none());

        prop.previous_line = Some(27.5);
        let result = model.evaluate_prop(&prop).unwrap();
        assert_eq!(result.prediction, "Under 24.5");
        assert_eq!(result.player_name.as_deref(), Some("LeBron James"));
        assert_eq!(result.bet_type, BetType::Prop);
    }

    // ==================== Contrarian ====================

    #[test]
    fn test_contrarian_fades_favorite_without_imbalance() {
        let model = ContrarianModel::default();
        let odds = vec![create_test_snapshot(vec![
            moneyline("a", -150, 130),
            moneyline("b", -150, 130),
            moneyline("c", -150, 130),
        ])];
        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        assert_eq!(result.prediction, "Grizzlies");
        assert!(approx(result.confidence, 0.53));
        assert_eq!(result.recommended_odds, 130);
    }

    #[test]
    fn test_contrarian_follows_outlier_book() {
        let model = ContrarianModel::default();
        let odds = vec![create_test_snapshot(vec![
            moneyline("a", -150, 130),
            moneyline("b", -150, 130),
            moneyline("sharp", -220, 180),
        ])];
        let result = model.evaluate_game(GAME, &odds, &GameContext::default()).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(result.reasoning.contains("imbalance"));
    }

    #[test]
    fn test_contrarian_prop_fades_over() {
        let model = ContrarianModel::default();
        let prop = create_test_prop(&[(25.5, -110, -110), (25.5, -110, -110), (25.5, -115, -105)]);
        let result = model.evaluate_prop(&prop).unwrap();
        assert_eq!(result.prediction, "Under 25.5");

        let thin = create_test_prop(&[(25.5, -110, -110)]);
        assert!(model.evaluate_prop(&thin).is_none());
    }

    // ==================== Hot/cold ====================

    #[test]
    fn test_hot_cold_backs_hotter_team() {
        let model = HotColdModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -120, 100)])];
        let context = GameContext {
            home_recent: (0..5).map(|d| record("Lakers", 110, 100, d)).collect(),
            away_recent: (0..5).map(|d| record("Grizzlies", 95, 105, d)).collect(),
            ..Default::default()
        };
        let result = model.evaluate_game(GAME, &odds, &context).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.80));
    }

    #[test]
    fn test_hot_cold_needs_min_samples() {
        let model = HotColdModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -120, 100)])];
        let context = GameContext {
            home_recent: (0..4).map(|d| record("Lakers", 110, 100, d)).collect(),
            away_recent: (0..5).map(|d| record("Grizzlies", 95, 105, d)).collect(),
            ..Default::default()
        };
        assert!(model.evaluate_game(GAME, &odds, &context).is_none());
    }

    #[test]
    fn test_hot_cold_prop_uses_recent_average() {
        let model = HotColdModel::default();
        let mut prop = create_test_prop(&[(25.5, -110, -110)]);
        prop.recent_values = vec![30.0, 31.0, 29.0, 30.0, 30.0];
        let result = model.evaluate_prop(&prop).unwrap();
        assert_eq!(result.prediction, "Over 25.5");

        prop.recent_values.truncate(3);
        assert!(model.evaluate_prop(&prop).is_none());
    }

    #[test]
    fn test_hot_cold_prop_averages_whole_window() {
        let model = HotColdModel::default();
        let mut prop = create_test_prop(&[(25.5, -110, -110)]);
        // Hot last five, slower five before that, then games outside the window
        prop.recent_values = [vec![30.0; 5], vec![28.0; 5], vec![10.0; 5]].concat();
        let result = model.evaluate_prop(&prop).unwrap();
        assert_eq!(result.prediction, "Over 25.5");
        assert!(result.reasoning.contains("averaging 29.0 over last 10"));

        // A 10-game average at the line is no signal even when the last five are hot
        prop.recent_values = [vec![30.0; 5], vec![21.0; 5]].concat();
        assert!(model.evaluate_prop(&prop).is_none());
    }

    // ==================== Rest/schedule ====================

    #[test]
    fn test_rest_schedule_backs_rested_team() {
        let model = RestScheduleModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -110, -110)])];
        let context = GameContext {
            home_schedule: Some(ScheduleInfo {
                team: "Lakers".to_string(),
                rest_days: 2,
                travel_miles: 0.0,
                games_last_7_days: 2,
            }),
            away_schedule: Some(ScheduleInfo {
                team: "Grizzlies".to_string(),
                rest_days: 0,
                travel_miles: 2000.0,
                games_last_7_days: 4,
            }),
            ..Default::default()
        };
        let result = model.evaluate_game(GAME, &odds, &context).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.75));

        let missing = GameContext {
            away_schedule: None,
            ..context
        };
        assert!(model.evaluate_game(GAME, &odds, &missing).is_none());
    }

    #[test]
    fn test_rest_schedule_prop_back_to_back() {
        let model = RestScheduleModel::default();
        let mut prop = create_test_prop(&[(25.5, -110, -110)]);
        prop.rest_days = Some(0);
        let result = model.evaluate_prop(&prop).unwrap();
        assert_eq!(result.prediction, "Under 25.5");
        assert!(approx(result.confidence, 0.56));

        prop.rest_days = Some(2);
        assert!(model.evaluate_prop(&prop).is_none());
    }

    // ==================== Matchup ====================

    #[test]
    fn test_matchup_head_to_head_dominance() {
        let model = MatchupModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -110, -110)])];
        let context = GameContext {
            head_to_head: (0..5).map(|_| meeting(110, 100)).collect(),
            ..Default::default()
        };
        let result = model.evaluate_game(GAME, &odds, &context).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.80));

        let few = GameContext {
            head_to_head: (0..4).map(|_| meeting(110, 100)).collect(),
            ..Default::default()
        };
        assert!(model.evaluate_game(GAME, &odds, &few).is_none());
    }

    #[test]
    fn test_matchup_prop_against_soft_defense() {
        let model = MatchupModel::default();
        let mut prop = create_test_prop(&[(20.0, -110, -110)]);
        prop.opponent_allowed_avg = Some(24.0);
        assert_eq!(model.evaluate_prop(&prop).unwrap().prediction, "Over 20");

        prop.opponent_allowed_avg = Some(20.5);
        assert!(model.evaluate_prop(&prop).is_none());
    }

    // ==================== Injury ====================

    #[test]
    fn test_injury_backs_healthier_team() {
        let model = InjuryAwareModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -110, -110)])];
        let context = GameContext {
            injuries: Some(vec![InjuryReport {
                team: "Grizzlies".to_string(),
                player: "Ja Morant".to_string(),
                status: InjuryStatus::Out,
                impact: 0.3,
            }]),
            ..Default::default()
        };
        let result = model.evaluate_game(GAME, &odds, &context).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.7325));
    }

    #[test]
    fn test_injury_unknown_is_not_healthy() {
        let model = InjuryAwareModel::default();
        let odds = vec![create_test_snapshot(vec![moneyline("a", -110, -110)])];
        assert!(model.evaluate_game(GAME, &odds, &GameContext::default()).is_none());

        let healthy = GameContext {
            injuries: Some(Vec::new()),
            ..Default::default()
        };
        assert!(model.evaluate_game(GAME, &odds, &healthy).is_none());
    }

    #[test]
    fn test_injury_prop_avoid_signal() {
        let model = InjuryAwareModel::default();
        let mut prop = create_test_prop(&[(25.5, -110, -110)]);
        prop.injury_status = Some(InjuryStatus::Out);
        let avoid = model.evaluate_prop(&prop).unwrap();
        assert_eq!(avoid.prediction, "Avoid LeBron James");
        assert_eq!(avoid.confidence, 0.95);
        assert!(crate::inverse::invert(&avoid, None).is_none());

        prop.injury_status = Some(InjuryStatus::Doubtful);
        assert_eq!(model.evaluate_prop(&prop).unwrap().prediction, "Under 25.5");

        prop.injury_status = Some(InjuryStatus::Probable);
        assert!(model.evaluate_prop(&prop).is_none());
    }

    // ==================== All models ====================

    #[test]
    fn test_every_model_abstains_on_empty_input() {
        let registry = ModelRegistry::default();
        let empty_prop = create_test_prop(&[]);
        for model in registry.resolve(ALL_MODELS).unwrap() {
            assert!(
                model.evaluate_game(GAME, &[], &GameContext::default()).is_none(),
                "{} spoke without odds",
                model.name()
            );
            assert!(model.evaluate_prop(&empty_prop).is_none(), "{} spoke without lines", model.name());
        }
    }

    #[test]
    fn test_every_model_confidence_in_range() {
        let registry = ModelRegistry::default();
        let odds = vec![
            create_test_snapshot(vec![
                BookmakerLine { home_spread: Some(-5.0), ..moneyline("a", -300, 200) },
                BookmakerLine { home_spread: Some(-5.0), ..moneyline("b", -280, 190) },
                BookmakerLine { home_spread: Some(-5.5), ..moneyline("c", -450, 250) },
            ]),
            create_test_snapshot(vec![BookmakerLine { home_spread: Some(-1.0), ..moneyline("a", -120, 100) }]),
        ];
        let context = GameContext {
            home_rating: Some(1800.0),
            away_rating: Some(1200.0),
            home_recent: (0..10).map(|d| record("Lakers", 130, 90, d)).collect(),
            away_recent: (0..10).map(|d| record("Grizzlies", 80, 120, d)).collect(),
            head_to_head: (0..8).map(|_| meeting(120, 90)).collect(),
            ..Default::default()
        };

        for model in registry.resolve(ALL_MODELS).unwrap() {
            if let Some(result) = model.evaluate_game(GAME, &odds, &context) {
                assert!(result.confidence > 0.0 && result.confidence <= 0.85, "{}", model.name());
                assert_eq!(result.model_name, model.name());
            }
        }
    }

    // ==================== Registry ====================

    #[test]
    fn test_registry_resolves_names() {
        let registry = ModelRegistry::default();
        let all = registry.resolve("ALL").unwrap();
        assert_eq!(all.len(), MODEL_NAMES.len());
        let names: Vec<&str> = all.iter().map(|m| m.name()).collect();
        assert_eq!(names, MODEL_NAMES.to_vec());

        let single = registry.resolve("matchup").unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name(), "matchup");
    }

    #[test]
    fn test_registry_unknown_model() {
        let registry = ModelRegistry::default();
        assert!(matches!(registry.create("astrology"), Err(Error::UnknownModel(name)) if name == "astrology"));
        assert!(registry.create_many(["value", "nope"]).is_err());
    }

    // ==================== Ensemble ====================

    #[test]
    fn test_ensemble_neutral_weights_average() {
        let ensemble = EnsembleModel::new(WeightSnapshot::empty("basketball_nba", BetType::Moneyline));
        let picks = vec![pick("consensus", "Lakers", 0.66, -150), pick("hot_cold", "Lakers", 0.60, -140)];
        let result = ensemble.combine(&picks, None, None).unwrap();
        assert_eq!(result.model_name, ENSEMBLE_NAME);
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.63));
        // Best price among the agreeing picks
        assert_eq!(result.recommended_odds, -140);
    }

    #[test]
    fn test_ensemble_coin_flip_abstains() {
        let ensemble = EnsembleModel::new(WeightSnapshot::empty("basketball_nba", BetType::Moneyline));
        let picks = vec![pick("value", "Lakers", 0.75, -120), pick("contrarian", "Grizzlies", 0.75, 100)];
        assert!(ensemble.combine(&picks, None, None).is_none());
        assert!(ensemble.combine(&[], None, None).is_none());
    }

    #[test]
    fn test_ensemble_skips_zero_weight() {
        let snapshot = WeightSnapshot::new(
            "basketball_nba",
            BetType::Moneyline,
            vec![weight("value", 1.0, false), weight("contrarian", 0.0, false)],
        );
        let ensemble = EnsembleModel::new(snapshot);
        let picks = vec![pick("value", "Lakers", 0.6, -120), pick("contrarian", "Grizzlies", 0.9, 100)];
        let result = ensemble.combine(&picks, None, None).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.6));
        assert!(!result.reasoning.contains("contrarian"));
    }

    #[test]
    fn test_ensemble_flips_inverted_model() {
        let snapshot = WeightSnapshot::new(
            "basketball_nba",
            BetType::Moneyline,
            vec![weight("momentum", 1.0, true)],
        );
        let ensemble = EnsembleModel::new(snapshot);
        let odds = create_test_snapshot(vec![moneyline("a", -150, 135)]);
        let result = ensemble
            .combine(&[pick("momentum", "Lakers", 0.7, -150)], Some(&odds), None)
            .unwrap();
        assert_eq!(result.prediction, "Grizzlies");
        assert!(approx(result.confidence, 0.7));
        assert_eq!(result.recommended_odds, 135);
        assert!(result.reasoning.contains("(inverted)"));
    }

    #[test]
    fn test_ensemble_inverted_model_cancels_agreeing_pick() {
        let snapshot = WeightSnapshot::new(
            "basketball_nba",
            BetType::Moneyline,
            vec![weight("value", 0.5, false), weight("momentum", 0.5, true)],
        );
        let ensemble = EnsembleModel::new(snapshot);
        let picks = vec![pick("value", "Lakers", 0.75, -120), pick("momentum", "Lakers", 0.75, -120)];
        assert!(ensemble.combine(&picks, None, None).is_none());
    }

    #[test]
    fn test_ensemble_ignores_other_markets() {
        let ensemble = EnsembleModel::new(WeightSnapshot::empty("basketball_nba", BetType::Moneyline));
        let mut total = pick("value", "Over 221.5", 0.9, -110);
        total.bet_type = BetType::Total;
        let picks = vec![pick("hot_cold", "Lakers", 0.6, -120), total];
        let result = ensemble.combine(&picks, None, None).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.6));
    }

    #[test]
    fn test_ensemble_avoid_signal_never_votes() {
        let snapshot = WeightSnapshot::new(
            "basketball_nba",
            BetType::Moneyline,
            vec![weight("injury_aware", 0.5, true), weight("hot_cold", 0.5, false)],
        );
        let ensemble = EnsembleModel::new(snapshot);
        let avoid = pick("injury_aware", "Avoid LeBron James", 0.95, -110);
        assert!(avoid.is_avoid());

        let picks = vec![avoid.clone(), pick("hot_cold", "Lakers", 0.6, -120)];
        let result = ensemble.combine(&picks, None, None).unwrap();
        assert_eq!(result.prediction, "Lakers");
        assert!(approx(result.confidence, 0.6));
        assert!(!result.reasoning.contains("injury_aware"));

        assert!(ensemble.combine(&[avoid], None, None).is_none());
    }
}
