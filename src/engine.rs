//! Poisson match-outcome prediction.
//!
//! Every function here is a pure transform of its inputs: no I/O, no shared
//! state, and no failure path. Sparse or missing data degrades the estimate
//! toward the league baseline instead of producing an error.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::h2h::{HeadToHeadRecord, average_goals_for_team};
use crate::league_params::{EngineParams, TOP_CORRECT_SCORES, league_baseline};
use crate::poisson::{GridSizing, ScoreGrid};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    #[serde(default)]
    pub name: String,
    /// Size of the dataset behind this team's stats; a confidence weight.
    #[serde(default)]
    pub matches_involved: u32,
}

impl TeamInfo {
    pub fn new(name: impl Into<String>, matches_involved: u32) -> Self {
        Self {
            name: name.into(),
            matches_involved,
        }
    }

    fn weight(&self) -> f64 {
        f64::from(self.matches_involved.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lambdas {
    pub lambda_a: f64,
    pub lambda_b: f64,
}

/// Market percentages derived from a score grid, each rounded on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcomes {
    pub team_a_win: u8,
    pub team_b_win: u8,
    pub draw: u8,
    pub btts: u8,
    pub over15: u8,
    pub over25: u8,
    pub over35: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectScore {
    /// `"A-B"`, team A's goals first.
    pub score: String,
    pub team_a_goals: u32,
    pub team_b_goals: u32,
    /// Percentage with one decimal, e.g. `12.3`.
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectScores {
    pub max_goals: usize,
    pub expanded: bool,
    pub scores: Vec<CorrectScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    pub team_a_win: u8,
    pub team_b_win: u8,
    pub draw: u8,
    pub btts: u8,
    pub over15: u8,
    pub over25: u8,
    pub over35: u8,
    pub lambda_a: f64,
    pub lambda_b: f64,
    pub max_goals: usize,
    #[serde(default)]
    pub correct_scores: Vec<CorrectScore>,
}

/// Inputs for one analysis, as a caller or request file provides them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    #[serde(default)]
    pub team_a: Option<TeamInfo>,
    #[serde(default)]
    pub team_b: Option<TeamInfo>,
    #[serde(default, alias = "h2h")]
    pub head_to_head: Vec<HeadToHeadRecord>,
    /// Dataset-wide matches; when present they set the league baseline.
    #[serde(default)]
    pub league_matches: Vec<HeadToHeadRecord>,
}

/// Blends each side's head-to-head scoring rate with the league baseline.
///
/// `lambda_a = (avg_a * m_a + league * m_b) / (m_a + m_b)`: the smaller a
/// team's own sample relative to its opponent's, the closer its rate sits to
/// the baseline. A team without head-to-head goals uses the baseline as its
/// own average.
pub fn compute_lambdas(
    team_a: &TeamInfo,
    team_b: &TeamInfo,
    h2h: &[HeadToHeadRecord],
    league_avg: f64,
) -> Lambdas {
    let own_rate = |team: &TeamInfo| {
        let avg = average_goals_for_team(&team.name, h2h).scored;
        if avg > 0.0 { avg } else { league_avg }
    };
    let avg_a = own_rate(team_a);
    let avg_b = own_rate(team_b);

    let m_a = team_a.weight();
    let m_b = team_b.weight();
    let total = m_a + m_b;
    if total <= 0.0 {
        return Lambdas {
            lambda_a: (avg_a + league_avg) / 2.0,
            lambda_b: (avg_b + league_avg) / 2.0,
        };
    }

    Lambdas {
        lambda_a: (avg_a * m_a + league_avg * m_b) / total,
        lambda_b: (avg_b * m_b + league_avg * m_a) / total,
    }
}

pub fn calculate_outcomes(grid: &ScoreGrid) -> Outcomes {
    let mut p_a = 0.0;
    let mut p_b = 0.0;
    let mut p_draw = 0.0;
    for (a, b, p) in grid.iter() {
        match a.cmp(&b) {
            Ordering::Greater => p_a += p,
            Ordering::Less => p_b += p,
            Ordering::Equal => p_draw += p,
        }
    }

    // Analytic for independent marginals; unaffected by grid truncation.
    let btts = (1.0 - (-grid.lambda_a().max(0.0)).exp()) * (1.0 - (-grid.lambda_b().max(0.0)).exp());

    Outcomes {
        team_a_win: percent(p_a),
        team_b_win: percent(p_b),
        draw: percent(p_draw),
        btts: percent(btts),
        over15: percent(1.0 - grid.mass_at_most(1)),
        over25: percent(1.0 - grid.mass_at_most(2)),
        over35: percent(1.0 - grid.mass_at_most(3)),
    }
}

/// The `top_n` most likely scorelines on the adaptive grid.
///
/// Ranking uses the displayed one-decimal percentage. Equal values list the
/// scoreline more favourable to team A first, then the one with fewer goals.
pub fn calculate_correct_scores(
    lambda_a: f64,
    lambda_b: f64,
    sizing: &GridSizing,
    top_n: usize,
) -> CorrectScores {
    if !lambda_a.is_finite() || !lambda_b.is_finite() {
        return CorrectScores {
            max_goals: 0,
            expanded: false,
            scores: Vec::new(),
        };
    }

    let grid = ScoreGrid::adaptive(lambda_a, lambda_b, sizing);
    CorrectScores {
        max_goals: grid.max_goals(),
        expanded: grid.max_goals() > sizing.base,
        scores: rank_scores(&grid, top_n),
    }
}

fn rank_scores(grid: &ScoreGrid, top_n: usize) -> Vec<CorrectScore> {
    let mut cells: Vec<(usize, usize, u64)> = grid
        .iter()
        .filter(|(_, _, p)| p.is_finite())
        .map(|(a, b, p)| (a, b, tenths_of_percent(p)))
        .collect();

    // Ordered by the displayed tenth of a percent, not the raw value: cells
    // that display the same are tied, and the tie goes to the larger team A
    // margin. (1.41, 1.11) therefore lists 2-1 before 0-1 at 8.9 each even
    // though 0-1 is marginally more likely.
    cells.sort_by(|x, y| {
        y.2.cmp(&x.2)
            .then_with(|| goal_diff(y).cmp(&goal_diff(x)))
            .then_with(|| (x.0 + x.1).cmp(&(y.0 + y.1)))
            .then_with(|| x.0.cmp(&y.0))
    });

    cells
        .into_iter()
        .take(top_n)
        .map(|(a, b, tenths)| CorrectScore {
            score: format!("{a}-{b}"),
            team_a_goals: a as u32,
            team_b_goals: b as u32,
            probability: tenths as f64 / 10.0,
        })
        .collect()
}

fn goal_diff(cell: &(usize, usize, u64)) -> i64 {
    cell.0 as i64 - cell.1 as i64
}

fn tenths_of_percent(p: f64) -> u64 {
    (p * 1000.0).round().clamp(0.0, 1000.0) as u64
}

fn percent(p: f64) -> u8 {
    (p * 100.0).round().clamp(0.0, 100.0) as u8
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Stateless engine bound to a set of [`EngineParams`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PredictionEngine {
    params: EngineParams,
}

impl PredictionEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn predict(
        &self,
        team_a: &TeamInfo,
        team_b: &TeamInfo,
        h2h: &[HeadToHeadRecord],
    ) -> Predictions {
        self.predict_with_baseline(team_a, team_b, h2h, self.params.league_avg_goals)
    }

    /// Like [`predict`](Self::predict); missing teams count as unnamed with
    /// no matches, and league matches, if any, replace the fixed baseline.
    pub fn predict_request(&self, request: &PredictionRequest) -> Predictions {
        let team_a = request.team_a.clone().unwrap_or_default();
        let team_b = request.team_b.clone().unwrap_or_default();
        let baseline = league_baseline(&request.league_matches, self.params.league_avg_goals);
        self.predict_with_baseline(&team_a, &team_b, &request.head_to_head, baseline.goals_per_team)
    }

    fn predict_with_baseline(
        &self,
        team_a: &TeamInfo,
        team_b: &TeamInfo,
        h2h: &[HeadToHeadRecord],
        league_avg: f64,
    ) -> Predictions {
        let Lambdas { lambda_a, lambda_b } = compute_lambdas(team_a, team_b, h2h, league_avg);

        let grid = ScoreGrid::adaptive(lambda_a, lambda_b, &self.params.grid);
        let outcomes = calculate_outcomes(&grid);
        let correct_scores = rank_scores(&grid, TOP_CORRECT_SCORES);

        Predictions {
            team_a_win: outcomes.team_a_win,
            team_b_win: outcomes.team_b_win,
            draw: outcomes.draw,
            btts: outcomes.btts,
            over15: outcomes.over15,
            over25: outcomes.over25,
            over35: outcomes.over35,
            lambda_a: round2(lambda_a),
            lambda_b: round2(lambda_b),
            max_goals: grid.max_goals(),
            correct_scores,
        }
    }
}
