use proptest::prelude::*;

use chambua_engine::engine::{PredictionEngine, TeamInfo, calculate_correct_scores, calculate_outcomes};
use chambua_engine::h2h::HeadToHeadRecord;
use chambua_engine::poisson::{GridSizing, MAX_GRID_SIZE, ScoreGrid};

fn meetings() -> impl Strategy<Value = Vec<HeadToHeadRecord>> {
    prop::collection::vec((0u32..6, 0u32..6, any::<bool>()), 0..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(x, y, a_home)| {
                if a_home {
                    HeadToHeadRecord::new("A", "B", x, y)
                } else {
                    HeadToHeadRecord::new("B", "A", y, x)
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn outcome_percentages_stay_consistent(la in 0.0f64..5.0, lb in 0.0f64..5.0) {
        let grid = ScoreGrid::adaptive(la, lb, &GridSizing::default());
        let o = calculate_outcomes(&grid);

        let total = u32::from(o.team_a_win) + u32::from(o.team_b_win) + u32::from(o.draw);
        prop_assert!((99..=101).contains(&total), "total {}", total);
        prop_assert!(o.over35 <= o.over25);
        prop_assert!(o.over25 <= o.over15);
        for v in [o.team_a_win, o.team_b_win, o.draw, o.btts, o.over15, o.over25, o.over35] {
            prop_assert!(v <= 100);
        }
    }

    #[test]
    fn grid_never_exceeds_cap(la in 0.0f64..12.0, lb in 0.0f64..12.0) {
        let grid = ScoreGrid::adaptive(la, lb, &GridSizing::default());
        prop_assert!(grid.max_goals() <= MAX_GRID_SIZE);
        prop_assert!(grid.total_mass() <= 1.0 + 1e-9);
    }

    #[test]
    fn top_scores_are_sorted(la in 0.0f64..5.0, lb in 0.0f64..5.0) {
        let cs = calculate_correct_scores(la, lb, &GridSizing::default(), 3);
        prop_assert_eq!(cs.scores.len(), 3);
        for pair in cs.scores.windows(2) {
            prop_assert!(pair[0].probability >= pair[1].probability);
        }
        for s in &cs.scores {
            prop_assert_eq!(s.score.clone(), format!("{}-{}", s.team_a_goals, s.team_b_goals));
        }
    }

    #[test]
    fn prediction_is_a_pure_function(h2h in meetings(), ma in 0u32..200, mb in 0u32..200) {
        let engine = PredictionEngine::default();
        let a = TeamInfo::new("A", ma);
        let b = TeamInfo::new("B", mb);
        prop_assert_eq!(engine.predict(&a, &b, &h2h), engine.predict(&a, &b, &h2h));
    }

    #[test]
    fn swapping_sides_mirrors_the_result(h2h in meetings(), ma in 0u32..200, mb in 0u32..200) {
        let engine = PredictionEngine::default();
        let a = TeamInfo::new("A", ma);
        let b = TeamInfo::new("B", mb);
        let forward = engine.predict(&a, &b, &h2h);
        let reverse = engine.predict(&b, &a, &h2h);
        // Summation order differs between the two grids.
        prop_assert!(forward.team_a_win.abs_diff(reverse.team_b_win) <= 1);
        prop_assert!(forward.draw.abs_diff(reverse.draw) <= 1);
        prop_assert_eq!(forward.btts, reverse.btts);
        prop_assert!(forward.over25.abs_diff(reverse.over25) <= 1);
    }
}
