use chambua_engine::engine::{
    PredictionEngine, TeamInfo, calculate_correct_scores, calculate_outcomes, compute_lambdas,
};
use chambua_engine::h2h::HeadToHeadRecord;
use chambua_engine::league_params::LEAGUE_AVG_GOALS;
use chambua_engine::poisson::{GridSizing, ScoreGrid};

fn top_scores(lambda_a: f64, lambda_b: f64) -> Vec<String> {
    calculate_correct_scores(lambda_a, lambda_b, &GridSizing::default(), 3)
        .scores
        .into_iter()
        .map(|s| s.score)
        .collect()
}

#[test]
fn typical_league_rates_rank_expected_scorelines() {
    let cs = calculate_correct_scores(1.41, 1.11, &GridSizing::default(), 3);
    let names: Vec<&str> = cs.scores.iter().map(|s| s.score.as_str()).collect();
    assert_eq!(names, vec!["1-1", "1-0", "2-1"]);

    // 12.6 + 11.3 + 8.9 under independent Poisson scoring.
    let sum: f64 = cs.scores.iter().map(|s| s.probability).sum();
    assert!((30.0..=35.0).contains(&sum), "sum was {sum}");
}

#[test]
fn high_scoring_matchup_expands_grid() {
    let cs = calculate_correct_scores(2.5, 1.5, &GridSizing::default(), 3);
    assert!(cs.expanded);
    assert!(cs.max_goals >= 11, "max_goals was {}", cs.max_goals);

    let names = top_scores(2.5, 1.5);
    assert!(names.iter().any(|s| s == "2-1" || s == "3-1" || s == "2-0"));
}

#[test]
fn defensive_matchup_favours_goalless_draw() {
    let names = top_scores(0.5, 0.5);
    assert_eq!(names[0], "0-0");
    assert!(names.contains(&"1-0".to_string()));
    assert!(names.contains(&"0-1".to_string()));
}

#[test]
fn symmetric_history_gives_balanced_prediction() {
    let h2h = vec![
        HeadToHeadRecord::new("Simba SC", "Young Africans", 2, 1),
        HeadToHeadRecord::new("Young Africans", "Simba SC", 2, 1),
        HeadToHeadRecord::new("Simba SC", "Young Africans", 1, 1),
        HeadToHeadRecord::new("Young Africans", "Simba SC", 0, 0),
    ];
    let a = TeamInfo::new("Simba SC", 100);
    let b = TeamInfo::new("Young Africans", 100);

    let p = PredictionEngine::default().predict(&a, &b, &h2h);
    let total = u32::from(p.team_a_win) + u32::from(p.team_b_win) + u32::from(p.draw);
    assert!((99..=101).contains(&total), "total was {total}");
    assert_eq!(p.correct_scores.len(), 3);
    assert!(p.team_a_win.abs_diff(p.team_b_win) <= 1);
    assert_eq!(p.lambda_a, 1.2);
    assert_eq!(p.lambda_b, 1.2);
}

#[test]
fn attacking_history_pushes_over_lines_up() {
    let h2h = vec![
        HeadToHeadRecord::new("Azam FC", "Coastal Union", 3, 2),
        HeadToHeadRecord::new("Coastal Union", "Azam FC", 2, 3),
        HeadToHeadRecord::new("Azam FC", "Coastal Union", 4, 2),
        HeadToHeadRecord::new("Coastal Union", "Azam FC", 2, 2),
    ];
    let a = TeamInfo::new("Azam FC", 10);
    let b = TeamInfo::new("Coastal Union", 10);

    let lambdas = compute_lambdas(&a, &b, &h2h, LEAGUE_AVG_GOALS);
    assert!((lambdas.lambda_a - 2.2).abs() < 1e-9);
    assert!((lambdas.lambda_b - 1.7).abs() < 1e-9);

    let p = PredictionEngine::default().predict(&a, &b, &h2h);
    assert!(p.over25 > 65 && p.over25 < 85, "over25 was {}", p.over25);
    assert!(p.over15 >= p.over25);
    assert!(p.over25 >= p.over35);
    assert!(p.team_a_win > p.team_b_win);
}

#[test]
fn outcomes_match_grid_for_known_rates() {
    let grid = ScoreGrid::adaptive(2.2, 1.7, &GridSizing::default());
    let o = calculate_outcomes(&grid);
    // Total goals ~ Poisson(3.9): P(<=1) = 9.9%, P(<=2) = 25.3%, P(<=3) = 45.3%.
    assert_eq!(o.over15, 90);
    assert_eq!(o.over25, 75);
    assert_eq!(o.over35, 55);
}

#[test]
fn no_history_falls_back_to_league_average() {
    let p = PredictionEngine::default().predict(
        &TeamInfo::new("Namungo", 0),
        &TeamInfo::new("Mtibwa Sugar", 0),
        &[],
    );
    assert_eq!(p.lambda_a, 1.4);
    assert_eq!(p.lambda_b, 1.4);
    assert_eq!(p.correct_scores.len(), 3);
}

#[test]
fn repeated_calls_are_identical() {
    let h2h = vec![
        HeadToHeadRecord::new("A", "B", 1, 0),
        HeadToHeadRecord::new("B", "A", 2, 2),
    ];
    let engine = PredictionEngine::default();
    let a = TeamInfo::new("A", 12);
    let b = TeamInfo::new("B", 7);
    assert_eq!(engine.predict(&a, &b, &h2h), engine.predict(&a, &b, &h2h));
}

#[test]
fn predictions_serialize_with_camel_case_fields() {
    let p = PredictionEngine::default().predict(&TeamInfo::new("A", 1), &TeamInfo::new("B", 1), &[]);
    let json = serde_json::to_value(&p).unwrap();
    for key in ["teamAWin", "teamBWin", "draw", "btts", "over15", "over25", "lambdaA", "lambdaB", "correctScores"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["correctScores"][0]["score"], "1-1");
}
