use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use chambua_engine::analysis_cache::{self, AnalysisCache, AnalysisKey};
use chambua_engine::engine::{PredictionEngine, PredictionRequest, Predictions};
use chambua_engine::league_params::EngineParams;
use chambua_engine::match_store::{self, StoredMatch};
use chambua_engine::telemetry;

const USAGE: &str = "usage:
  chambua predict <request.json|-> [--db PATH] [--league-id N --season S] [--pretty]
  chambua import <matches.json> [--db PATH]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    telemetry::init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.first().map(String::as_str) {
        Some("predict") => run_predict(&args[1..]),
        Some("import") => run_import(&args[1..]),
        _ => Err(anyhow!("{USAGE}")),
    }
}

fn run_predict(args: &[String]) -> Result<()> {
    let input = positional(args).context("missing request file")?;
    let raw = read_input(&input)?;
    let mut request: PredictionRequest =
        serde_json::from_str(&raw).context("invalid prediction request json")?;

    if let Some(db_path) = parse_path_arg(args, "--db") {
        let conn = match_store::open_db(&db_path)?;
        fill_from_store(&conn, &mut request)?;
    }

    let engine = PredictionEngine::new(*EngineParams::global());
    let predictions = match cache_key(args, &request) {
        Some(key) => predict_cached(&engine, &request, &key)?,
        None => engine.predict_request(&request),
    };

    let out = if has_flag(args, "--pretty") {
        serde_json::to_string_pretty(&predictions)
    } else {
        serde_json::to_string(&predictions)
    }
    .context("serialize predictions")?;
    println!("{out}");
    Ok(())
}

fn fill_from_store(conn: &rusqlite::Connection, request: &mut PredictionRequest) -> Result<()> {
    let name_a = request.team_a.as_ref().map(|t| t.name.clone()).unwrap_or_default();
    let name_b = request.team_b.as_ref().map(|t| t.name.clone()).unwrap_or_default();
    if name_a.is_empty() || name_b.is_empty() {
        return Ok(());
    }

    if request.head_to_head.is_empty() {
        request.head_to_head = match_store::load_head_to_head(conn, &name_a, &name_b)?
            .iter()
            .filter_map(StoredMatch::as_head_to_head)
            .collect();
        info!(
            team_a = %name_a,
            team_b = %name_b,
            meetings = request.head_to_head.len(),
            "loaded head-to-head from store"
        );
    }

    for slot in [&mut request.team_a, &mut request.team_b] {
        let Some(team) = slot.as_mut() else {
            continue;
        };
        if team.matches_involved == 0 {
            team.matches_involved = match_store::team_info(conn, &team.name)?.matches_involved;
        }
    }
    Ok(())
}

fn predict_cached(
    engine: &PredictionEngine,
    request: &PredictionRequest,
    key: &AnalysisKey,
) -> Result<Predictions> {
    let Some(path) = analysis_cache::default_cache_path() else {
        return Ok(engine.predict_request(request));
    };
    let cache = AnalysisCache::load_from(&path);
    let predictions = cache.get_or_compute(key, || engine.predict_request(request));
    cache.save_to(&path)?;
    Ok(predictions)
}

fn cache_key(args: &[String], request: &PredictionRequest) -> Option<AnalysisKey> {
    let league_id = parse_value_arg(args, "--league-id")?.parse::<u32>().ok()?;
    let season = parse_value_arg(args, "--season")?;
    AnalysisKey::for_request(league_id, season, request)
}

fn run_import(args: &[String]) -> Result<()> {
    let input = positional(args).context("missing matches file")?;
    let raw = read_input(&input)?;
    let rows: Vec<StoredMatch> = serde_json::from_str(&raw).context("invalid matches json")?;

    let db_path = parse_path_arg(args, "--db")
        .or_else(match_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = match_store::open_db(&db_path)?;
    let n = match_store::upsert_matches(&mut conn, &rows)?;

    if let Some(path) = analysis_cache::default_cache_path() {
        let cache = AnalysisCache::load_from(&path);
        if cache.invalidate_imported(&rows) > 0 {
            cache.save_to(&path)?;
        }
    }

    println!("Imported {n} matches into {}", db_path.display());
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("read stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(input).with_context(|| format!("read {input}"))
}

fn positional(args: &[String]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if matches!(arg.as_str(), "--db" | "--league-id" | "--season") {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return Some(arg.clone());
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_value_arg(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(args: &[String], name: &str) -> Option<PathBuf> {
    parse_value_arg(args, name).map(PathBuf::from)
}
