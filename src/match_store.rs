use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis_cache::app_cache_dir;
use crate::engine::TeamInfo;
use crate::h2h::HeadToHeadRecord;

const SELECT_COLUMNS: &str = r#"
    match_id, league_id, season, utc_time, home_team, away_team,
    home_goals, away_goals, finished
"#;

/// One match row in the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub match_id: u64,
    pub league_id: u32,
    pub season: String,
    pub utc_time: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_goals: Option<u32>,
    #[serde(default)]
    pub away_goals: Option<u32>,
    #[serde(default = "default_finished")]
    pub finished: bool,
}

fn default_finished() -> bool {
    true
}

impl StoredMatch {
    pub fn is_played(&self) -> bool {
        self.finished && self.home_goals.is_some() && self.away_goals.is_some()
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn is_meeting(&self, team_a: &str, team_b: &str) -> bool {
        (self.home_team == team_a && self.away_team == team_b)
            || (self.home_team == team_b && self.away_team == team_a)
    }

    pub fn as_head_to_head(&self) -> Option<HeadToHeadRecord> {
        if !self.is_played() {
            return None;
        }
        Some(HeadToHeadRecord::new(
            self.home_team.clone(),
            self.away_team.clone(),
            self.home_goals?,
            self.away_goals?,
        ))
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("matches.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            league_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            utc_time TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            finished INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_league_season ON matches(league_id, season);
        CREATE INDEX IF NOT EXISTS idx_matches_home ON matches(home_team);
        CREATE INDEX IF NOT EXISTS idx_matches_away ON matches(away_team);
        CREATE INDEX IF NOT EXISTS idx_matches_utc_time ON matches(utc_time);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Inserts or replaces rows by `match_id` in one transaction.
pub fn upsert_matches(conn: &mut Connection, matches: &[StoredMatch]) -> Result<usize> {
    let updated_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin upsert transaction")?;
    for m in matches {
        tx.execute(
            r#"
            INSERT INTO matches (
                match_id, league_id, season, utc_time, home_team, away_team,
                home_goals, away_goals, finished, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(match_id) DO UPDATE SET
                league_id = excluded.league_id,
                season = excluded.season,
                utc_time = excluded.utc_time,
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                home_goals = excluded.home_goals,
                away_goals = excluded.away_goals,
                finished = excluded.finished,
                updated_at = excluded.updated_at
            "#,
            params![
                m.match_id as i64,
                m.league_id as i64,
                m.season,
                m.utc_time,
                m.home_team,
                m.away_team,
                m.home_goals,
                m.away_goals,
                m.finished,
                updated_at,
            ],
        )
        .with_context(|| format!("upsert match {}", m.match_id))?;
    }
    tx.commit().context("commit upsert transaction")?;
    info!(rows = matches.len(), "match store upsert complete");
    Ok(matches.len())
}

/// Finished meetings between two teams in either orientation, oldest first.
pub fn load_head_to_head(conn: &Connection, team_a: &str, team_b: &str) -> Result<Vec<StoredMatch>> {
    let sql = format!(
        r#"
        SELECT {SELECT_COLUMNS}
        FROM matches
        WHERE ((home_team = ?1 AND away_team = ?2) OR (home_team = ?2 AND away_team = ?1))
          AND finished = 1
          AND home_goals IS NOT NULL
          AND away_goals IS NOT NULL
        ORDER BY utc_time ASC, match_id ASC
        "#
    );
    query_matches(conn, &sql, params![team_a, team_b]).context("load head-to-head matches")
}

/// Finished matches, optionally for one league, oldest first.
pub fn load_finished_matches(conn: &Connection, league_id: Option<u32>) -> Result<Vec<StoredMatch>> {
    let sql = format!(
        r#"
        SELECT {SELECT_COLUMNS}
        FROM matches
        WHERE (?1 IS NULL OR league_id = ?1)
          AND finished = 1
          AND home_goals IS NOT NULL
          AND away_goals IS NOT NULL
        ORDER BY utc_time ASC, match_id ASC
        "#
    );
    query_matches(conn, &sql, params![league_id.map(i64::from)]).context("load finished matches")
}

/// `TeamInfo` whose `matches_involved` counts the team's finished matches.
pub fn team_info(conn: &Connection, team: &str) -> Result<TeamInfo> {
    let count: Option<i64> = conn
        .query_row(
            r#"
            SELECT COUNT(*) FROM matches
            WHERE (home_team = ?1 OR away_team = ?1)
              AND finished = 1
              AND home_goals IS NOT NULL
              AND away_goals IS NOT NULL
            "#,
            params![team],
            |row| row.get(0),
        )
        .optional()
        .context("count team matches")?;
    let matches_involved = u32::try_from(count.unwrap_or(0)).unwrap_or(u32::MAX);
    Ok(TeamInfo::new(team, matches_involved))
}

fn query_matches(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<StoredMatch>> {
    let mut stmt = conn.prepare(sql).context("prepare match query")?;
    let rows = stmt
        .query_map(args, |row| {
            Ok(StoredMatch {
                match_id: row.get::<_, i64>(0)? as u64,
                league_id: row.get::<_, u32>(1)?,
                season: row.get(2)?,
                utc_time: row.get(3)?,
                home_team: row.get(4)?,
                away_team: row.get(5)?,
                home_goals: row.get(6)?,
                away_goals: row.get(7)?,
                finished: row.get::<_, i64>(8)? != 0,
            })
        })
        .context("run match query")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read match row")?);
    }
    Ok(out)
}
