use std::path::PathBuf;
use std::str::FromStr;

use vidstats_core::report::StatFamilies;
use vidstats_pipeline::runner::{MalformedPolicy, RunOptions, DEFAULT_BATCH_SIZE};

use crate::output::OutputFormat;

/// Configuration errors. Reported before any project access.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Run configuration loaded from environment variables.
///
/// Built once at startup and passed by reference; never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    pub project_id: String,
    /// Restrict the run to one dataset (matched by id or name).
    pub dataset_id: Option<String>,
    /// Root directory of the local project store (default: `.`).
    pub projects_root: PathBuf,
    pub families: StatFamilies,
    pub output: OutputFormat,
    pub on_malformed: MalformedPolicy,
    /// Annotations downloaded concurrently (default: `10`).
    pub batch_size: usize,
}

impl StatsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default    |
    /// |--------------------------|------------|
    /// | `VIDSTATS_PROJECT_ID`    | (required) |
    /// | `VIDSTATS_DATASET_ID`    | (none)     |
    /// | `VIDSTATS_PROJECTS_ROOT` | `.`        |
    /// | `VIDSTATS_STATS`         | `both`     |
    /// | `VIDSTATS_OUTPUT`        | `markdown` |
    /// | `VIDSTATS_ON_MALFORMED`  | `abort`    |
    /// | `VIDSTATS_BATCH_SIZE`    | `10`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let project_id =
            get("VIDSTATS_PROJECT_ID").ok_or(ConfigError::Missing("VIDSTATS_PROJECT_ID"))?;
        let dataset_id = get("VIDSTATS_DATASET_ID");
        let projects_root =
            PathBuf::from(get("VIDSTATS_PROJECTS_ROOT").unwrap_or_else(|| ".".into()));

        let families = parse_or("VIDSTATS_STATS", get("VIDSTATS_STATS"), StatFamilies::Both)?;
        let output = parse_or(
            "VIDSTATS_OUTPUT",
            get("VIDSTATS_OUTPUT"),
            OutputFormat::Markdown,
        )?;
        let on_malformed = parse_or(
            "VIDSTATS_ON_MALFORMED",
            get("VIDSTATS_ON_MALFORMED"),
            MalformedPolicy::Abort,
        )?;

        let batch_size: usize = parse_or(
            "VIDSTATS_BATCH_SIZE",
            get("VIDSTATS_BATCH_SIZE"),
            DEFAULT_BATCH_SIZE,
        )?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "VIDSTATS_BATCH_SIZE",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            project_id,
            dataset_id,
            projects_root,
            families,
            output,
            on_malformed,
            batch_size,
        })
    }

    /// Options handed to the run driver.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            project_id: self.project_id.clone(),
            dataset: self.dataset_id.clone(),
            families: self.families,
            on_malformed: self.on_malformed,
            batch_size: self.batch_size,
        }
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
