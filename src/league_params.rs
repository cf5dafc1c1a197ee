use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::h2h::HeadToHeadRecord;
use crate::poisson::GridSizing;

/// Goals per team per match assumed when there is no head-to-head signal.
pub const LEAGUE_AVG_GOALS: f64 = 1.4;
/// Number of correct scores every `Predictions` carries.
pub const TOP_CORRECT_SCORES: usize = 3;

// Below this many league matches the observed baseline is shrunk toward the default.
const MIN_BASELINE_MATCHES: f64 = 200.0;

static GLOBAL: OnceCell<EngineParams> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    pub league_avg_goals: f64,
    pub grid: GridSizing,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            league_avg_goals: LEAGUE_AVG_GOALS,
            grid: GridSizing::default(),
        }
    }
}

impl EngineParams {
    /// Parameters from `CHAMBUA_*` environment variables, defaults otherwise.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Process-wide parameters, read from the environment on first use.
    pub fn global() -> &'static EngineParams {
        GLOBAL.get_or_init(Self::from_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_f64 = |key: &str| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        let parse_usize = |key: &str| lookup(key).and_then(|raw| raw.trim().parse::<usize>().ok());

        let league_avg_goals = parse_f64("CHAMBUA_LEAGUE_AVG_GOALS")
            .unwrap_or(defaults.league_avg_goals)
            .clamp(0.2, 5.0);
        let cap = parse_usize("CHAMBUA_GRID_CAP")
            .unwrap_or(defaults.grid.cap)
            .clamp(2, 20);
        let base = parse_usize("CHAMBUA_GRID_BASE")
            .unwrap_or(defaults.grid.base)
            .clamp(2, cap);
        let tail_epsilon = parse_f64("CHAMBUA_GRID_TAIL_EPSILON")
            .unwrap_or(defaults.grid.tail_epsilon)
            .clamp(1e-9, 0.05);

        Self {
            league_avg_goals,
            grid: GridSizing {
                base,
                cap,
                tail_epsilon,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueBaseline {
    pub sample_matches: usize,
    pub goals_per_team: f64,
}

/// Goals per team per match over a dataset-wide match list.
///
/// Small samples are shrunk toward `fallback` so a handful of high-scoring
/// games cannot swing every prediction in the league.
pub fn league_baseline(matches: &[HeadToHeadRecord], fallback: f64) -> LeagueBaseline {
    let mut total_goals = 0u64;
    let mut n = 0usize;
    for m in matches {
        let (home, away) = m.goals();
        total_goals += u64::from(home) + u64::from(away);
        n += 1;
    }

    if n == 0 {
        return LeagueBaseline {
            sample_matches: 0,
            goals_per_team: fallback,
        };
    }

    let observed = total_goals as f64 / (2.0 * n as f64);
    let w = (n as f64 / MIN_BASELINE_MATCHES).clamp(0.0, 1.0);
    LeagueBaseline {
        sample_matches: n,
        goals_per_team: (1.0 - w) * fallback + w * observed,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(EngineParams::from_lookup(|_| None), EngineParams::default());
    }

    #[test]
    fn overrides_are_parsed_and_clamped() {
        let params = EngineParams::from_lookup(lookup_from(&[
            ("CHAMBUA_LEAGUE_AVG_GOALS", " 1.25 "),
            ("CHAMBUA_GRID_CAP", "99"),
            ("CHAMBUA_GRID_BASE", "1"),
            ("CHAMBUA_GRID_TAIL_EPSILON", "abc"),
        ]));
        assert!((params.league_avg_goals - 1.25).abs() < 1e-12);
        assert_eq!(params.grid.cap, 20);
        assert_eq!(params.grid.base, 2);
        assert_eq!(params.grid.tail_epsilon, GridSizing::default().tail_epsilon);
    }

    #[test]
    fn baseline_without_matches_is_fallback() {
        let b = league_baseline(&[], LEAGUE_AVG_GOALS);
        assert_eq!(b.sample_matches, 0);
        assert_eq!(b.goals_per_team, LEAGUE_AVG_GOALS);
    }

    #[test]
    fn small_samples_shrink_toward_fallback() {
        let matches = vec![HeadToHeadRecord::new("A", "B", 4, 4); 20];
        let b = league_baseline(&matches, LEAGUE_AVG_GOALS);
        // observed 4.0, weight 0.1
        assert!((b.goals_per_team - (0.9 * 1.4 + 0.1 * 4.0)).abs() < 1e-12);
    }

    #[test]
    fn large_samples_use_observed_rate() {
        let matches = vec![HeadToHeadRecord::new("A", "B", 2, 1); 400];
        let b = league_baseline(&matches, LEAGUE_AVG_GOALS);
        assert!((b.goals_per_team - 1.5).abs() < 1e-12);
    }
}
