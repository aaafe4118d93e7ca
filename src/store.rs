//! Result store
//!
//! Persists the ranked leaderboard as a JSON cache record with a validity
//! window. Writes go to a temporary file that is renamed over the target, so a
//! reader sees either the previous record or the new one.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::PersistenceError;
use crate::{EvaluationResult, Leaderboard, ParameterSet};

/// Durable snapshot of one completed optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Missing or unparsable timestamps read back as `None`, which counts as stale
    #[serde(default, deserialize_with = "deserialize_last_run")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_points: usize,
    #[serde(default)]
    pub best_strategies: Leaderboard,
}

impl CacheRecord {
    pub fn best(&self) -> Option<&EvaluationResult> {
        self.best_strategies.first()
    }

    pub fn best_parameters(&self) -> Option<ParameterSet> {
        self.best().map(|r| r.parameters)
    }

    /// Time since `last_run`, if known
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_run.map(|t| now - t)
    }
}

/// Accepts RFC 3339, or a naive ISO-8601 timestamp interpreted as UTC
fn deserialize_last_run<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// JSON file store for [`CacheRecord`]
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(path: impl AsRef<Path>, ttl: Duration) -> Self {
        ResultStore {
            path: path.as_ref().to_path_buf(),
            ttl,
        }
    }

    /// An out-of-range TTL saturates, so such a cache never expires
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.results_path, config.ttl().unwrap_or(Duration::MAX))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persist a leaderboard stamped with the current time
    pub fn save(
        &self,
        leaderboard: &[EvaluationResult],
        data_points: usize,
    ) -> Result<CacheRecord, PersistenceError> {
        self.save_at(leaderboard, data_points, Utc::now())
    }

    /// Persist a leaderboard stamped with `now`, replacing any previous record
    pub fn save_at(
        &self,
        leaderboard: &[EvaluationResult],
        data_points: usize,
        now: DateTime<Utc>,
    ) -> Result<CacheRecord, PersistenceError> {
        let record = CacheRecord {
            last_run: Some(now),
            data_points,
            best_strategies: leaderboard.iter().map(EvaluationResult::sanitized).collect(),
        };

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PersistenceError::Io { path, source }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let json = serde_json::to_string_pretty(&record).map_err(PersistenceError::Serialize)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(&self.path)(e));
        }

        info!(
            "Saved {} strategies to {}",
            record.best_strategies.len(),
            self.path.display()
        );
        Ok(record)
    }

    /// Read the cache record, surfacing why it is unusable
    pub fn try_load(&self) -> Result<Option<CacheRecord>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the cache record; a missing or unreadable file is `None`
    pub fn load(&self) -> Option<CacheRecord> {
        match self.try_load() {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!("No cache file at {}", self.path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring unusable cache file: {}", e);
                None
            }
        }
    }

    /// Whether `record` is present, timestamped and within the validity window
    pub fn is_fresh(&self, record: Option<&CacheRecord>) -> bool {
        self.is_fresh_at(record, Utc::now())
    }

    pub fn is_fresh_at(&self, record: Option<&CacheRecord>, now: DateTime<Utc>) -> bool {
        match record.and_then(|r| r.age_at(now)) {
            Some(age) => age <= self.ttl,
            None => false,
        }
    }

    /// Parameters of the top-ranked cached entry
    pub fn best_parameters(&self) -> Option<ParameterSet> {
        self.load().and_then(|r| r.best_parameters())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "results.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
