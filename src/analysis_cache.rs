use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::{PredictionRequest, Predictions};
use crate::match_store::StoredMatch;

const CACHE_VERSION: u32 = 2;
const CACHE_DIR: &str = "chambua";
const CACHE_FILE: &str = "analysis_cache.json";

/// Identifies one matchup analysis within a league season.
///
/// `inputs` is a digest of everything the prediction was computed from, so
/// the same matchup with different history is a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisKey {
    pub league_id: u32,
    pub season_id: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(default)]
    pub inputs: String,
}

impl AnalysisKey {
    pub fn new(
        league_id: u32,
        season_id: impl Into<String>,
        team_a: impl Into<String>,
        team_b: impl Into<String>,
    ) -> Self {
        Self {
            league_id,
            season_id: season_id.into(),
            team_a: team_a.into(),
            team_b: team_b.into(),
            inputs: String::new(),
        }
    }

    /// Key for a request whose two teams are named; `None` otherwise.
    pub fn for_request(
        league_id: u32,
        season_id: impl Into<String>,
        request: &PredictionRequest,
    ) -> Option<Self> {
        let team_a = request.team_a.as_ref().filter(|t| !t.name.is_empty())?;
        let team_b = request.team_b.as_ref().filter(|t| !t.name.is_empty())?;
        Some(Self {
            inputs: request_digest(request),
            ..Self::new(league_id, season_id, team_a.name.clone(), team_b.name.clone())
        })
    }

    fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    fn in_season(&self, league_id: u32, season_id: &str) -> bool {
        self.league_id == league_id && self.season_id == season_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: AnalysisKey,
    predictions: Predictions,
    computed_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// Prediction results keyed by league, season and matchup.
///
/// Entries are dropped when new match data arrives for a team, season or
/// league, or when they outlive the optional TTL.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: Mutex<HashMap<AnalysisKey, CacheEntry>>,
    ttl_secs: Option<i64>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = Some(ttl_secs.max(0));
        self
    }

    pub fn get(&self, key: &AnalysisKey) -> Option<Predictions> {
        let now = Utc::now().timestamp();
        let mut guard = self.entries.lock().expect("analysis cache lock poisoned");
        let entry = guard.get(key)?;
        let expired = self.ttl_secs.is_some_and(|ttl| now - entry.computed_at > ttl);
        if !expired {
            return Some(entry.predictions.clone());
        }
        guard.remove(key);
        debug!(?key, "analysis cache entry expired");
        None
    }

    pub fn insert(&self, key: AnalysisKey, predictions: Predictions) {
        self.insert_at(key, predictions, Utc::now().timestamp());
    }

    fn insert_at(&self, key: AnalysisKey, predictions: Predictions, computed_at: i64) {
        let entry = CacheEntry {
            key: key.clone(),
            predictions,
            computed_at,
        };
        let mut guard = self.entries.lock().expect("analysis cache lock poisoned");
        guard.insert(key, entry);
    }

    /// Returns the cached result or computes and stores it. The lock is not
    /// held while `compute` runs.
    pub fn get_or_compute(
        &self,
        key: &AnalysisKey,
        compute: impl FnOnce() -> Predictions,
    ) -> Predictions {
        if let Some(hit) = self.get(key) {
            debug!(?key, "analysis cache hit");
            return hit;
        }
        debug!(?key, "analysis cache miss");
        let predictions = compute();
        self.insert(key.clone(), predictions.clone());
        predictions
    }

    /// Drops every matchup involving `team` in one league season.
    pub fn invalidate_team(&self, league_id: u32, season_id: &str, team: &str) -> usize {
        self.retain(|k| !(k.in_season(league_id, season_id) && k.involves(team)))
    }

    /// Drops what newly stored matches can change: every entry in their
    /// seasons, and every entry for their teams in any season, since
    /// head-to-head history spans seasons.
    pub fn invalidate_imported(&self, rows: &[StoredMatch]) -> usize {
        let removed = self.retain(|k| {
            !rows.iter().any(|m| {
                k.in_season(m.league_id, &m.season)
                    || k.involves(&m.home_team)
                    || k.involves(&m.away_team)
            })
        });
        if removed > 0 {
            debug!(removed, rows = rows.len(), "analysis cache invalidated after import");
        }
        removed
    }

    pub fn invalidate_season(&self, league_id: u32, season_id: &str) -> usize {
        self.retain(|k| !k.in_season(league_id, season_id))
    }

    pub fn invalidate_league(&self, league_id: u32) -> usize {
        self.retain(|k| k.league_id != league_id)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("analysis cache lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("analysis cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&self, keep: impl Fn(&AnalysisKey) -> bool) -> usize {
        let mut guard = self.entries.lock().expect("analysis cache lock poisoned");
        let before = guard.len();
        guard.retain(|k, _| keep(k));
        before - guard.len()
    }

    /// Loads a cache file; anything missing, unreadable or from another
    /// version yields an empty cache.
    pub fn load_from(path: &Path) -> Self {
        let cache = Self::new();
        let Ok(raw) = fs::read_to_string(path) else {
            return cache;
        };
        let Ok(file) = serde_json::from_str::<CacheFile>(&raw) else {
            return cache;
        };
        if file.version != CACHE_VERSION {
            return cache;
        }
        for entry in file.entries {
            cache.insert_at(entry.key, entry.predictions, entry.computed_at);
        }
        cache
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = {
            let guard = self.entries.lock().expect("analysis cache lock poisoned");
            CacheFile {
                version: CACHE_VERSION,
                entries: guard.values().cloned().collect(),
            }
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create cache dir {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&file).context("serialize analysis cache")?;
        fs::write(&tmp, json).context("write analysis cache")?;
        fs::rename(&tmp, path).context("swap analysis cache")?;
        Ok(())
    }
}

/// SHA-256 over the resolved inputs: team sizes, head-to-head meetings and
/// league matches with their goals already resolved from any alias.
pub fn request_digest(request: &PredictionRequest) -> String {
    let mut hasher = Sha256::new();
    for team in [&request.team_a, &request.team_b] {
        let (name, matches) = team
            .as_ref()
            .map_or(("", 0), |t| (t.name.as_str(), t.matches_involved));
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(matches.to_le_bytes());
    }
    for (tag, records) in [(b'h', &request.head_to_head), (b'l', &request.league_matches)] {
        hasher.update([tag]);
        hasher.update((records.len() as u64).to_le_bytes());
        for r in records {
            let (home, away) = r.goals();
            hasher.update(r.home_team.as_bytes());
            hasher.update([0u8]);
            hasher.update(r.away_team.as_bytes());
            hasher.update([0u8]);
            hasher.update(home.to_le_bytes());
            hasher.update(away.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// `$XDG_CACHE_HOME/chambua`, else `$HOME/.cache/chambua`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}
