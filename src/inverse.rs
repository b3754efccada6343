//! Inverse predictions and ROI / risk classification
//!
//! The inverse of a pick swaps the predicted side (home/away, over/under, or
//! the complementary handicap), takes `1 - confidence`, and prices the
//! opposite side. ROI and risk are always recomputed from the new values so
//! an inverted pick never carries figures from the original.

use crate::types::{format_line, AnalysisResult, BetType, OddsSnapshot, PropSnapshot, RiskLevel, Side};
use serde::{Deserialize, Serialize};

/// Derived figures for a pick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub roi: f64,
    pub risk_level: RiskLevel,
}

/// Recompute ROI and risk tier from confidence and odds
pub fn classify(result: &AnalysisResult) -> Classification {
    Classification {
        roi: result.roi(),
        risk_level: result.risk_level(),
    }
}

/// Which side of its market a pick is on
pub fn predicted_side(result: &AnalysisResult) -> Option<Side> {
    let prediction = result.prediction.trim();
    if starts_with_word(prediction, "over") {
        return Some(Side::Over);
    }
    if starts_with_word(prediction, "under") {
        return Some(Side::Under);
    }
    team_side(result).map(|(side, _)| side)
}

/// Label of the opposite side, or `None` when the pick has no complement
pub fn opposite_prediction(result: &AnalysisResult) -> Option<String> {
    let prediction = result.prediction.trim();
    if starts_with_word(prediction, "over") {
        return Some(format!("Under{}", &prediction[4..]));
    }
    if starts_with_word(prediction, "under") {
        return Some(format!("Over{}", &prediction[5..]));
    }

    let (side, rest) = team_side(result)?;
    let opponent = match side {
        Side::Home => result.away_team.as_deref()?,
        _ => result.home_team.as_deref()?,
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Some(opponent.to_string());
    }
    if rest.eq_ignore_ascii_case("pk") {
        return Some(format!("{} PK", opponent));
    }
    let line: f64 = rest.parse().ok()?;
    Some(format!("{} {}", opponent, format_line(-line)))
}

/// Price of the opposite side from the latest game odds or prop lines
pub fn opposite_odds(
    result: &AnalysisResult,
    snapshot: Option<&OddsSnapshot>,
    prop: Option<&PropSnapshot>,
) -> Option<i32> {
    let side = predicted_side(result)?.opposite();
    match result.bet_type {
        BetType::Prop => prop?.best_price(side).map(|(price, _)| price),
        bet_type => snapshot?.best_price(bet_type, side).map(|(price, _)| price),
    }
}

/// Mirror of a price when the opposite side was not quoted: -110 <-> +110
pub fn mirror_odds(odds: i32) -> i32 {
    if odds == 0 {
        odds
    } else {
        -odds
    }
}

/// Build the logical opposite of a pick.
///
/// Returns `None` when the pick has no complementary side (e.g. an "avoid"
/// signal) or when the inverse confidence would not be positive.
pub fn invert(result: &AnalysisResult, opposite_odds: Option<i32>) -> Option<AnalysisResult> {
    let prediction = opposite_prediction(result)?;
    let confidence = 1.0 - result.confidence;
    if confidence <= 0.0 {
        return None;
    }

    let recommended_odds = opposite_odds.unwrap_or_else(|| mirror_odds(result.recommended_odds));
    let bookmaker = if opposite_odds.is_some() {
        result.bookmaker.clone()
    } else {
        None
    };

    Some(AnalysisResult {
        prediction,
        confidence,
        recommended_odds,
        bookmaker,
        reasoning: format!("Inverse of {}: {}", result.model_name, result.reasoning),
        ..result.clone()
    })
}

/// Case-insensitive `"{word} "` prefix; never slices inside a multi-byte char
fn starts_with_word(text: &str, word: &str) -> bool {
    text.get(..word.len()).is_some_and(|head| head.eq_ignore_ascii_case(word))
        && text.get(word.len()..).is_some_and(|tail| tail.starts_with(' '))
}

/// Match the pick against the team names, longest name first
fn team_side(result: &AnalysisResult) -> Option<(Side, &str)> {
    let prediction = result.prediction.trim();
    let mut candidates: Vec<(Side, &str)> = Vec::new();
    if let Some(home) = result.home_team.as_deref() {
        candidates.push((Side::Home, home));
    }
    if let Some(away) = result.away_team.as_deref() {
        candidates.push((Side::Away, away));
    }
    candidates.sort_by_key(|(_, name)| std::cmp::Reverse(name.len()));

    candidates.into_iter().find_map(|(side, team)| {
        let rest = prediction.strip_prefix(team)?;
        if rest.is_empty() || rest.starts_with(' ') {
            Some((side, rest))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisType;

    fn lakers_pick() -> AnalysisResult {
        AnalysisResult {
            game_id: "g1".to_string(),
            sport: "basketball_nba".to_string(),
            model_name: "consensus".to_string(),
            analysis_type: AnalysisType::Game,
            bet_type: BetType::Moneyline,
            prediction: "Lakers".to_string(),
            confidence: 0.60,
            reasoning: "books agree".to_string(),
            recommended_odds: -110,
            home_team: Some("Lakers".to_string()),
            away_team: Some("Grizzlies".to_string()),
            player_name: None,
            market_key: None,
            bookmaker: Some("draftkings".to_string()),
        }
    }

    #[test]
    fn test_inverse_example() {
        let inverse = invert(&lakers_pick(), Some(90)).unwrap();
        assert_eq!(inverse.prediction, "Grizzlies");
        assert!((inverse.confidence - 0.40).abs() < 1e-9);
        assert_eq!(inverse.recommended_odds, 90);
        assert!((inverse.roi() - (-0.24)).abs() < 1e-9);
        assert_eq!(inverse.risk_level(), RiskLevel::Aggressive);
    }

    #[test]
    fn test_roi_is_recomputed_not_copied() {
        let original = lakers_pick();
        let inverse = invert(&original, Some(90)).unwrap();
        assert!((classify(&original).roi - inverse.roi()).abs() > 0.1);
        assert_eq!(classify(&original).risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_double_inverse_restores_side_and_confidence() {
        let original = lakers_pick();
        let back = invert(&invert(&original, Some(90)).unwrap(), Some(-110)).unwrap();
        assert_eq!(back.prediction, original.prediction);
        assert!((back.confidence - original.confidence).abs() < 1e-9);
    }

    #[test]
    fn test_spread_inverse() {
        let mut pick = lakers_pick();
        pick.bet_type = BetType::Spread;
        pick.prediction = "Lakers -3.5".to_string();
        let inverse = invert(&pick, None).unwrap();
        assert_eq!(inverse.prediction, "Grizzlies +3.5");
        // No opposite price quoted, so the original is mirrored
        assert_eq!(inverse.recommended_odds, 110);
        assert!(inverse.bookmaker.is_none());

        let back = invert(&inverse, None).unwrap();
        assert_eq!(back.prediction, "Lakers -3.5");
        assert_eq!(back.recommended_odds, -110);
    }

    #[test]
    fn test_total_and_prop_inverse() {
        let mut pick = lakers_pick();
        pick.bet_type = BetType::Total;
        pick.prediction = "Over 221.5".to_string();
        assert_eq!(opposite_prediction(&pick).unwrap(), "Under 221.5");

        pick.analysis_type = AnalysisType::Prop;
        pick.bet_type = BetType::Prop;
        pick.prediction = "Under 25.5".to_string();
        assert_eq!(opposite_prediction(&pick).unwrap(), "Over 25.5");
    }

    #[test]
    fn test_avoid_has_no_inverse() {
        let mut pick = lakers_pick();
        pick.analysis_type = AnalysisType::Prop;
        pick.bet_type = BetType::Prop;
        pick.home_team = None;
        pick.away_team = None;
        pick.prediction = "Avoid LeBron James".to_string();
        assert!(invert(&pick, None).is_none());
    }

    #[test]
    fn test_full_confidence_cannot_invert() {
        let mut pick = lakers_pick();
        pick.confidence = 1.0;
        assert!(invert(&pick, Some(90)).is_none());
    }

    #[test]
    fn test_team_prefix_prefers_longest_name() {
        let mut pick = lakers_pick();
        pick.home_team = Some("LA".to_string());
        pick.away_team = Some("LA Lakers".to_string());
        pick.prediction = "LA Lakers".to_string();
        assert_eq!(predicted_side(&pick), Some(Side::Away));
        assert_eq!(opposite_prediction(&pick).unwrap(), "LA");
    }

    #[test]
    fn test_accented_team_names() {
        let mut pick = lakers_pick();
        pick.sport = "soccer_spain_la_liga".to_string();
        pick.home_team = Some("Atlético Madrid".to_string());
        pick.away_team = Some("Real Madrid".to_string());
        pick.prediction = "Atlético Madrid".to_string();

        assert_eq!(predicted_side(&pick), Some(Side::Home));
        let inverse = invert(&pick, None).unwrap();
        assert_eq!(inverse.prediction, "Real Madrid");

        pick.bet_type = BetType::Spread;
        pick.prediction = "Atlético Madrid -0.5".to_string();
        assert_eq!(opposite_prediction(&pick).unwrap(), "Real Madrid +0.5");
    }

    #[test]
    fn test_risk_tiers() {
        assert_eq!(RiskLevel::from_confidence(0.70), RiskLevel::Conservative);
        assert_eq!(RiskLevel::from_confidence(0.65), RiskLevel::Conservative);
        assert_eq!(RiskLevel::from_confidence(0.55), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_confidence(0.54), RiskLevel::Aggressive);
    }
}
