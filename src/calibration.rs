//! Scoring published market probabilities against final scores.

use std::cmp::Ordering;

use serde::Serialize;

use crate::engine::Predictions;

/// Full-time result from team A's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchResult {
    TeamAWin,
    Draw,
    TeamBWin,
}

impl MatchResult {
    pub fn from_score(team_a_goals: u32, team_b_goals: u32) -> Self {
        match team_a_goals.cmp(&team_b_goals) {
            Ordering::Greater => Self::TeamAWin,
            Ordering::Equal => Self::Draw,
            Ordering::Less => Self::TeamBWin,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::TeamAWin => 0,
            Self::Draw => 1,
            Self::TeamBWin => 2,
        }
    }
}

/// Probabilities, as fractions, for the markets a prediction publishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketForecast {
    /// Team A win, draw, team B win.
    pub result: [f64; 3],
    pub btts: f64,
    pub over25: f64,
}

impl MarketForecast {
    pub fn uniform() -> Self {
        Self {
            result: [1.0 / 3.0; 3],
            btts: 0.5,
            over25: 0.5,
        }
    }

    /// The result percentages are rounded independently, so they are
    /// rescaled to sum to 1.
    pub fn from_predictions(p: &Predictions) -> Self {
        let raw = [p.team_a_win, p.draw, p.team_b_win].map(f64::from);
        let total: f64 = raw.iter().sum();
        let result = if total > 0.0 {
            raw.map(|v| v / total)
        } else {
            Self::uniform().result
        };
        Self {
            result,
            btts: f64::from(p.btts) / 100.0,
            over25: f64::from(p.over25) / 100.0,
        }
    }

    /// Observed frequencies over a set of final scores; uniform when empty.
    pub fn base_rates(scores: &[(u32, u32)]) -> Self {
        if scores.is_empty() {
            return Self::uniform();
        }
        let step = 1.0 / scores.len() as f64;
        let mut rates = Self {
            result: [0.0; 3],
            btts: 0.0,
            over25: 0.0,
        };
        for &(a, b) in scores {
            rates.result[MatchResult::from_score(a, b).slot()] += step;
            if a > 0 && b > 0 {
                rates.btts += step;
            }
            if a + b > 2 {
                rates.over25 += step;
            }
        }
        rates
    }

    /// Most likely result; a draw wins ties, then team A.
    pub fn favourite(&self) -> MatchResult {
        let [a, d, b] = self.result;
        if d >= a && d >= b {
            MatchResult::Draw
        } else if a >= b {
            MatchResult::TeamAWin
        } else {
            MatchResult::TeamBWin
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreCard {
    pub samples: usize,
    /// Three-way Brier score of the result market, 0 (perfect) to 2.
    pub result_brier: f64,
    pub result_log_loss: f64,
    /// Share of matches that ended in the forecast's favourite result.
    pub result_hit_rate: f64,
    pub btts_brier: f64,
    pub over25_brier: f64,
}

/// Running sums behind a [`ScoreCard`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreTally {
    samples: usize,
    hits: usize,
    result_brier: f64,
    result_log_loss: f64,
    btts_brier: f64,
    over25_brier: f64,
}

impl ScoreTally {
    pub fn record(&mut self, forecast: &MarketForecast, team_a_goals: u32, team_b_goals: u32) {
        let actual = MatchResult::from_score(team_a_goals, team_b_goals);
        for (slot, p) in forecast.result.iter().enumerate() {
            self.result_brier += squared_error(*p, slot == actual.slot());
        }
        self.result_log_loss -= forecast.result[actual.slot()].clamp(1e-12, 1.0).ln();
        if forecast.favourite() == actual {
            self.hits += 1;
        }
        self.btts_brier += squared_error(forecast.btts, team_a_goals > 0 && team_b_goals > 0);
        self.over25_brier += squared_error(forecast.over25, team_a_goals + team_b_goals > 2);
        self.samples += 1;
    }

    pub fn finish(&self) -> ScoreCard {
        if self.samples == 0 {
            return ScoreCard::default();
        }
        let n = self.samples as f64;
        ScoreCard {
            samples: self.samples,
            result_brier: self.result_brier / n,
            result_log_loss: self.result_log_loss / n,
            result_hit_rate: self.hits as f64 / n,
            btts_brier: self.btts_brier / n,
            over25_brier: self.over25_brier / n,
        }
    }
}

/// Scores each forecast against the final score at the same index.
pub fn score_forecasts(forecasts: &[MarketForecast], scores: &[(u32, u32)]) -> ScoreCard {
    let mut tally = ScoreTally::default();
    for (forecast, &(a, b)) in forecasts.iter().zip(scores) {
        tally.record(forecast, a, b);
    }
    tally.finish()
}

/// Scores one forecast issued for every match.
pub fn score_constant(forecast: &MarketForecast, scores: &[(u32, u32)]) -> ScoreCard {
    let mut tally = ScoreTally::default();
    for &(a, b) in scores {
        tally.record(forecast, a, b);
    }
    tally.finish()
}

fn squared_error(p: f64, happened: bool) -> f64 {
    let y = if happened { 1.0 } else { 0.0 };
    (p - y).powi(2)
}
