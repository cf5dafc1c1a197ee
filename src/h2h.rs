use serde::{Deserialize, Serialize};

/// A goal count as upstream providers send it: a JSON number or numeric text.
/// Any other JSON value is kept as `Other` and never yields a count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalField {
    Count(f64),
    Text(String),
    Other(serde_json::Value),
}

impl GoalField {
    fn as_count(&self) -> Option<u32> {
        match self {
            GoalField::Count(v) => count_from_f64(*v),
            GoalField::Text(_) | GoalField::Other(_) => None,
        }
    }

    fn parse_text(&self) -> Option<u32> {
        match self {
            GoalField::Text(raw) => parse_goal_text(raw),
            GoalField::Count(_) | GoalField::Other(_) => None,
        }
    }
}

/// One historical meeting between two teams, oriented home/away.
///
/// Goals may be present under any of the accepted aliases; use
/// [`HeadToHeadRecord::goals`] to resolve them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadToHeadRecord {
    #[serde(default, alias = "home_team")]
    pub home_team: String,
    #[serde(default, alias = "away_team")]
    pub away_team: String,
    #[serde(default, alias = "home_goals", skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<GoalField>,
    #[serde(default, alias = "away_goals", skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<GoalField>,
    #[serde(
        default,
        rename = "home_score",
        alias = "homeScore",
        skip_serializing_if = "Option::is_none"
    )]
    pub home_score: Option<GoalField>,
    #[serde(
        default,
        rename = "away_score",
        alias = "awayScore",
        skip_serializing_if = "Option::is_none"
    )]
    pub away_score: Option<GoalField>,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl HeadToHeadRecord {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_goals: u32,
        away_goals: u32,
    ) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_goals: Some(GoalField::Count(f64::from(home_goals))),
            away_goals: Some(GoalField::Count(f64::from(away_goals))),
            ..Self::default()
        }
    }

    /// Resolved `(home, away)` goals.
    ///
    /// Per side: numeric `homeGoals`, then numeric `home_score`, then the
    /// `"H-A"` result string, then numeric text in either field, then 0.
    pub fn goals(&self) -> (u32, u32) {
        let from_result = self.result.as_deref().and_then(parse_result);
        let home = resolve_goals(
            self.home_goals.as_ref(),
            self.home_score.as_ref(),
            from_result.map(|(h, _)| h),
        );
        let away = resolve_goals(
            self.away_goals.as_ref(),
            self.away_score.as_ref(),
            from_result.map(|(_, a)| a),
        );
        (home, away)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Goals `(for, against)` from `team`'s side, `None` if it did not play.
    pub fn goals_for_team(&self, team: &str) -> Option<(u32, u32)> {
        let (home, away) = self.goals();
        if self.home_team == team {
            Some((home, away))
        } else if self.away_team == team {
            Some((away, home))
        } else {
            None
        }
    }
}

/// Mean goals scored and conceded by one team over the meetings it played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalAverages {
    pub scored: f64,
    pub conceded: f64,
    pub matches: usize,
}

/// Averages `team`'s goals over the records it appears in (exact name match).
///
/// An unknown team or an empty list gives all zeros; callers treat a zero
/// average as "no head-to-head signal".
pub fn average_goals_for_team(team: &str, records: &[HeadToHeadRecord]) -> GoalAverages {
    let mut scored = 0u64;
    let mut conceded = 0u64;
    let mut matches = 0usize;

    for record in records {
        let Some((gf, ga)) = record.goals_for_team(team) else {
            continue;
        };
        scored += u64::from(gf);
        conceded += u64::from(ga);
        matches += 1;
    }

    if matches == 0 {
        return GoalAverages::default();
    }

    let n = matches as f64;
    GoalAverages {
        scored: scored as f64 / n,
        conceded: conceded as f64 / n,
        matches,
    }
}

fn resolve_goals(
    primary: Option<&GoalField>,
    alternate: Option<&GoalField>,
    from_result: Option<u32>,
) -> u32 {
    primary
        .and_then(GoalField::as_count)
        .or_else(|| alternate.and_then(GoalField::as_count))
        .or(from_result)
        .or_else(|| primary.and_then(GoalField::parse_text))
        .or_else(|| alternate.and_then(GoalField::parse_text))
        .unwrap_or(0)
}

/// Parses `"2-1"`, `"2 - 1"` or `"2:1"`.
fn parse_result(raw: &str) -> Option<(u32, u32)> {
    let (home, away) = raw.trim().split_once(['-', ':'])?;
    Some((parse_goal_text(home)?, parse_goal_text(away)?))
}

fn parse_goal_text(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    s.parse::<f64>().ok().and_then(count_from_f64)
}

fn count_from_f64(v: f64) -> Option<u32> {
    if !v.is_finite() || v < 0.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v.round() as u32)
}
