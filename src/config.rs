use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::Context;

/// Tunables the engine reads. Kept out of the computation modules so
/// callers always pass them in explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub points_per_completion: i32,
    pub relevance_window_days: i64,
    pub relevant_limit: usize,
    pub streak_safety_cap: u32,
    pub weekly_progress_weeks: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            points_per_completion: 50,
            relevance_window_days: 7,
            relevant_limit: 10,
            streak_safety_cap: 100,
            weekly_progress_weeks: 4,
        }
    }
}

const MAX_WINDOW_DAYS: i64 = 3650;
const MAX_PROGRESS_WEEKS: i64 = 520;

impl EngineSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = EngineSettings::default();
        EngineSettings {
            points_per_completion: parse_or(
                &lookup,
                "POINTS_PER_COMPLETION",
                defaults.points_per_completion,
            ),
            relevance_window_days: parse_in_range(
                &lookup,
                "RELEVANCE_WINDOW_DAYS",
                defaults.relevance_window_days,
                0..=MAX_WINDOW_DAYS,
            ),
            relevant_limit: parse_or(&lookup, "RELEVANT_LIMIT", defaults.relevant_limit),
            streak_safety_cap: parse_or(&lookup, "STREAK_SAFETY_CAP", defaults.streak_safety_cap),
            weekly_progress_weeks: parse_in_range(
                &lookup,
                "WEEKLY_PROGRESS_WEEKS",
                defaults.weekly_progress_weeks,
                0..=MAX_PROGRESS_WEEKS,
            ),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}

/// Like `parse_or`, but values outside `range` are also replaced by the
/// default. Day and week spans feed date arithmetic that must stay in range.
fn parse_in_range<T: FromStr + PartialOrd + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> T {
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        return value;
    }
    tracing::warn!(key, value = ?lookup(key), "ignoring out-of-range setting");
    default
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub engine: EngineSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            database_url: env::var("DATABASE_URL").ok(),
            engine: EngineSettings::from_lookup(|key| env::var(key).ok()),
        }
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }
}
