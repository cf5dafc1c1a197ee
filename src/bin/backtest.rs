use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use chambua_engine::backtest;
use chambua_engine::calibration::ScoreCard;
use chambua_engine::engine::PredictionEngine;
use chambua_engine::league_params::EngineParams;
use chambua_engine::match_store;
use chambua_engine::telemetry;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    telemetry::init_tracing();

    let db_path = parse_db_path_arg()
        .or_else(match_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let league_id = parse_u32_arg("--league-id");

    let conn = match_store::open_db(&db_path)?;
    let rows = match_store::load_finished_matches(&conn, league_id)?;
    if rows.is_empty() {
        return Err(anyhow!("no finished matches found in {}", db_path.display()));
    }

    let engine = PredictionEngine::new(*EngineParams::global());
    let report = backtest::walk_forward(&engine, &rows);

    println!("Walk-forward backtest");
    println!("DB: {}", db_path.display());
    if let Some(id) = league_id {
        println!("League: {id}");
    }
    println!("Samples: {}", report.samples);
    println!("Without earlier meetings: {}", report.cold_starts);
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        println!("Range UTC: {} -> {}", first.utc_time, last.utc_time);
    }
    println!();
    print_card("Poisson model", report.model);
    print_card("Uniform baseline", report.uniform);
    print_card("Base-rate baseline", report.base_rate);

    Ok(())
}

fn print_card(label: &str, card: ScoreCard) {
    println!(
        "{label:<20} n={:<6} 1x2 brier={:.4} log_loss={:.4} hit={:.1}% | btts brier={:.4} | o2.5 brier={:.4}",
        card.samples,
        card.result_brier,
        card.result_log_loss,
        card.result_hit_rate * 100.0,
        card.btts_brier,
        card.over25_brier
    );
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_u32_arg(name: &str) -> Option<u32> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return raw.trim().parse().ok();
        }
        if arg == name {
            return args.get(idx + 1).and_then(|v| v.trim().parse().ok());
        }
    }
    None
}
