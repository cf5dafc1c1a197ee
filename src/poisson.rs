use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scores 0-5 per side.
pub const BASE_GRID_SIZE: usize = 6;
pub const MAX_GRID_SIZE: usize = 15;
/// Largest joint probability mass the grid may leave outside its bounds.
pub const GRID_TAIL_EPSILON: f64 = 1e-4;

/// How large a score grid to build for a pair of goal rates.
///
/// The grid starts at `base` goals per side and grows one goal at a time
/// while more than `tail_epsilon` of the joint mass falls outside it, up to
/// `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSizing {
    pub base: usize,
    pub cap: usize,
    pub tail_epsilon: f64,
}

impl Default for GridSizing {
    fn default() -> Self {
        Self {
            base: BASE_GRID_SIZE,
            cap: MAX_GRID_SIZE,
            tail_epsilon: GRID_TAIL_EPSILON,
        }
    }
}

impl GridSizing {
    pub fn resolve(&self, lambda_a: f64, lambda_b: f64) -> usize {
        let base = self.base.max(1);
        let cap = self.cap.max(base);
        let mut size = base;
        while size < cap && missing_mass(lambda_a, lambda_b, size) > self.tail_epsilon {
            size += 1;
        }
        size
    }
}

pub fn factorial(k: u32) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc * f64::from(i))
}

/// `lambda^k * e^-lambda / k!`; negative rates are treated as 0.
pub fn poisson_pmf(lambda: f64, k: u32) -> f64 {
    let lambda = lambda.max(0.0);
    lambda.powi(k as i32) * (-lambda).exp() / factorial(k)
}

fn pmf_row(lambda: f64, size: usize) -> Vec<f64> {
    (0..size as u32).map(|k| poisson_pmf(lambda, k)).collect()
}

fn missing_mass(lambda_a: f64, lambda_b: f64, size: usize) -> f64 {
    let a: f64 = pmf_row(lambda_a, size).iter().sum();
    let b: f64 = pmf_row(lambda_b, size).iter().sum();
    1.0 - a * b
}

/// Joint scoreline probabilities for two independent Poisson scorers.
///
/// Cell `(a, b)` holds `P(team A scores a) * P(team B scores b)` for
/// `a, b < max_goals`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreGrid {
    lambda_a: f64,
    lambda_b: f64,
    max_goals: usize,
    cells: Vec<f64>,
}

impl ScoreGrid {
    pub fn build(lambda_a: f64, lambda_b: f64, max_goals: usize) -> Self {
        let row_a = pmf_row(lambda_a, max_goals);
        let row_b = pmf_row(lambda_b, max_goals);
        let mut cells = Vec::with_capacity(max_goals * max_goals);
        for pa in &row_a {
            for pb in &row_b {
                cells.push(pa * pb);
            }
        }
        Self {
            lambda_a,
            lambda_b,
            max_goals,
            cells,
        }
    }

    pub fn adaptive(lambda_a: f64, lambda_b: f64, sizing: &GridSizing) -> Self {
        let max_goals = sizing.resolve(lambda_a, lambda_b);
        if max_goals > sizing.base {
            debug!(
                event = "grid_expanded",
                max_goals,
                lambda_a,
                lambda_b,
                "Adaptive maxGoals={max_goals}"
            );
        }
        Self::build(lambda_a, lambda_b, max_goals)
    }

    pub fn lambda_a(&self) -> f64 {
        self.lambda_a
    }

    pub fn lambda_b(&self) -> f64 {
        self.lambda_b
    }

    pub fn max_goals(&self) -> usize {
        self.max_goals
    }

    /// Probability of the exact score `a-b`; 0 outside the grid.
    pub fn prob(&self, a: usize, b: usize) -> f64 {
        if a >= self.max_goals || b >= self.max_goals {
            return 0.0;
        }
        self.cells[a * self.max_goals + b]
    }

    /// `(a, b, probability)` for every cell, team A goals major.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.max_goals;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, p)| (idx / n, idx % n, *p))
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Mass of scorelines with at most `goals` in total.
    pub fn mass_at_most(&self, goals: usize) -> f64 {
        self.iter()
            .filter(|(a, b, _)| a + b <= goals)
            .map(|(_, _, p)| p)
            .sum()
    }
}
