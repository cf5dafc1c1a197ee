use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::calibration::{self, MarketForecast, ScoreCard};
use crate::engine::{PredictionEngine, TeamInfo};
use crate::h2h::HeadToHeadRecord;
use crate::match_store::StoredMatch;

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub samples: usize,
    /// Matches predicted without a single earlier meeting.
    pub cold_starts: usize,
    pub model: ScoreCard,
    pub uniform: ScoreCard,
    /// In-sample market frequencies issued for every match.
    pub base_rate: ScoreCard,
}

/// Predicts every played match from strictly earlier data and scores the
/// result, BTTS and over 2.5 markets against the final score.
///
/// `matches` must be in kickoff order. Earlier meetings of the same two
/// teams serve as head-to-head history; earlier appearances of each team
/// give its `matches_involved`.
pub fn walk_forward(engine: &PredictionEngine, matches: &[StoredMatch]) -> BacktestReport {
    let played: Vec<&StoredMatch> = matches.iter().filter(|m| m.is_played()).collect();

    let rows: Vec<(MarketForecast, (u32, u32), bool)> = played
        .par_iter()
        .enumerate()
        .map(|(idx, m)| {
            let history = &played[..idx];
            let h2h: Vec<HeadToHeadRecord> = history
                .iter()
                .filter(|p| p.is_meeting(&m.home_team, &m.away_team))
                .filter_map(|p| p.as_head_to_head())
                .collect();
            let team_a = TeamInfo::new(m.home_team.clone(), appearances(history, &m.home_team));
            let team_b = TeamInfo::new(m.away_team.clone(), appearances(history, &m.away_team));

            let predictions = engine.predict(&team_a, &team_b, &h2h);
            let score = (m.home_goals.unwrap_or_default(), m.away_goals.unwrap_or_default());
            (MarketForecast::from_predictions(&predictions), score, h2h.is_empty())
        })
        .collect();

    let forecasts: Vec<MarketForecast> = rows.iter().map(|r| r.0).collect();
    let scores: Vec<(u32, u32)> = rows.iter().map(|r| r.1).collect();
    let cold_starts = rows.iter().filter(|r| r.2).count();

    let model = calibration::score_forecasts(&forecasts, &scores);
    let uniform = calibration::score_constant(&MarketForecast::uniform(), &scores);
    let base_rate = calibration::score_constant(&MarketForecast::base_rates(&scores), &scores);

    info!(
        samples = scores.len(),
        cold_starts,
        log_loss = model.result_log_loss,
        brier = model.result_brier,
        btts_brier = model.btts_brier,
        over25_brier = model.over25_brier,
        "walk-forward backtest complete"
    );

    BacktestReport {
        samples: scores.len(),
        cold_starts,
        model,
        uniform,
        base_rate,
    }
}

fn appearances(history: &[&StoredMatch], team: &str) -> u32 {
    let n = history.iter().filter(|m| m.involves(team)).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}
