//! Application-level configuration loading, including the movie catalog seed.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::models::MovieEntity,
    state::{progression::ProgressionMode, room::RoundRules},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CINEGUESS_BACK_CONFIG_PATH";

const DEFAULT_ROUND_SECONDS: u32 = 10;
const DEFAULT_ROUNDS_PER_ROOM: usize = 10;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    round_seconds: u32,
    rounds_per_room: usize,
    tick_interval: Duration,
    store_timeout: Duration,
    max_save_attempts: u32,
    progression: ProgressionMode,
    movies: Vec<MovieEntity>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        movies = app_config.movies.len(),
                        progression = ?app_config.progression,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Round length and room size.
    pub fn rules(&self) -> RoundRules {
        RoundRules {
            round_seconds: self.round_seconds,
            rounds_per_room: self.rounds_per_room,
        }
    }

    /// Delay between two ticker steps.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Upper bound for a single storage call.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// How many read-modify-write attempts a mutation gets before giving up.
    pub fn max_save_attempts(&self) -> u32 {
        self.max_save_attempts
    }

    /// Countdown strategy for playing rooms.
    pub fn progression(&self) -> ProgressionMode {
        self.progression
    }

    /// Movies seeding the catalog.
    pub fn movies(&self) -> &[MovieEntity] {
        &self.movies
    }

    /// Override the progression mode.
    pub fn with_progression(mut self, progression: ProgressionMode) -> Self {
        self.progression = progression;
        self
    }

    /// Override the ticker period.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Replace the seed catalog.
    pub fn with_movies(mut self, movies: Vec<MovieEntity>) -> Self {
        self.movies = movies;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            round_seconds: DEFAULT_ROUND_SECONDS,
            rounds_per_room: DEFAULT_ROUNDS_PER_ROOM,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
            progression: ProgressionMode::default(),
            movies: default_movies(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    round_seconds: Option<u32>,
    rounds_per_room: Option<usize>,
    tick_interval_ms: Option<u64>,
    store_timeout_ms: Option<u64>,
    max_save_attempts: Option<u32>,
    progression: Option<ProgressionMode>,
    movies: Option<Vec<RawMovie>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            round_seconds: value
                .round_seconds
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.round_seconds),
            rounds_per_room: value
                .rounds_per_room
                .filter(|count| *count > 0)
                .unwrap_or(defaults.rounds_per_room),
            tick_interval: value
                .tick_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            store_timeout: value
                .store_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            max_save_attempts: value
                .max_save_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_save_attempts),
            progression: value.progression.unwrap_or(defaults.progression),
            movies: value
                .movies
                .map(|movies| movies.into_iter().map(Into::into).collect())
                .unwrap_or(defaults.movies),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of a catalog movie inside the configuration file.
struct RawMovie {
    id: String,
    title: String,
    image_url: String,
    year: i32,
    genre: String,
}

impl From<RawMovie> for MovieEntity {
    fn from(value: RawMovie) -> Self {
        Self {
            id: value.id,
            title: value.title,
            image_url: value.image_url,
            year: value.year,
            genre: value.genre,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

const UNSPLASH_SUFFIX: &str = "?auto=format&fit=crop&q=80&w=1200";

/// `(id, title, unsplash photo, year, genre)` of the built-in catalog.
const SEED_MOVIES: [(&str, &str, &str, i32, &str); 20] = [
    ("1", "Interstellar", "photo-1446776811953-b23d57bd21aa", 2014, "Sci-Fi"),
    ("2", "The Dark Knight", "photo-1478720568477-152d9b164e26", 2008, "Action"),
    ("3", "Inception", "photo-1536440136628-849c177e76a1", 2010, "Sci-Fi"),
    ("4", "Blade Runner 2049", "photo-1614728263952-84ea256f9679", 2017, "Sci-Fi"),
    ("5", "Dune", "photo-1506466010722-395aa2bef877", 2021, "Sci-Fi"),
    ("6", "Mad Max: Fury Road", "photo-1533613220915-609f661a6fe1", 2015, "Action"),
    ("7", "Arrival", "photo-1451187580459-43490279c0fa", 2016, "Sci-Fi"),
    ("8", "The Matrix", "photo-1550751827-4bd374c3f58b", 1999, "Action"),
    (
        "9",
        "Spider-Man: Into the Spider-Verse",
        "photo-1635805737707-575885ab0820",
        2018,
        "Animation",
    ),
    ("10", "The Grand Budapest Hotel", "photo-1518709268805-4e9042af9f23", 2014, "Comedy"),
    ("11", "Pulp Fiction", "photo-1594909122845-11baa439b7bf", 1994, "Crime"),
    ("12", "The Shawshank Redemption", "photo-1534447677768-be436bb09401", 1994, "Drama"),
    ("13", "Parasite", "photo-1585951237318-9ea5e175b891", 2019, "Thriller"),
    (
        "14",
        "Everything Everywhere All at Once",
        "photo-1626814026160-2237a95fc5a0",
        2022,
        "Sci-Fi",
    ),
    ("15", "The Godfather", "photo-1536440136628-849c177e76a1", 1972, "Crime"),
    ("16", "Spirited Away", "photo-1528127269322-539801943592", 2001, "Animation"),
    ("17", "Gladiator", "photo-1514539079130-25950c84af65", 2000, "Action"),
    ("18", "The Silence of the Lambs", "photo-1509248961158-e54f6934749c", 1991, "Thriller"),
    ("19", "Jurassic Park", "photo-1568702846914-96b3c5d2aaeb", 1993, "Adventure"),
    ("20", "Alien", "photo-1446776811953-b23d57bd21aa", 1979, "Horror"),
];

/// Built-in movie catalog shipped with the binary.
fn default_movies() -> Vec<MovieEntity> {
    SEED_MOVIES
        .iter()
        .map(|(id, title, photo, year, genre)| MovieEntity {
            id: (*id).to_string(),
            title: (*title).to_string(),
            image_url: format!("https://images.unsplash.com/{photo}{UNSPLASH_SUFFIX}"),
            year: *year,
            genre: (*genre).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "round_seconds": 15, "progression": "ticking" }"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.rules().round_seconds, 15);
        assert_eq!(config.rules().rounds_per_room, 10);
        assert_eq!(config.progression(), ProgressionMode::Ticking);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert_eq!(config.movies().len(), 20);
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "round_seconds": 0, "max_save_attempts": 0 }"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.rules().round_seconds, 10);
        assert_eq!(config.max_save_attempts(), 5);
    }

    #[test]
    fn movies_use_camel_case_keys() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "movies": [{ "id": "a", "title": "Alien", "imageUrl": "https://x/a.jpg", "year": 1979, "genre": "Horror" }] }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.movies().len(), 1);
        assert_eq!(config.movies()[0].image_url, "https://x/a.jpg");
    }

    #[test]
    fn default_seed_has_unique_ids() {
        let movies = default_movies();
        let mut ids = movies.iter().map(|m| m.id.as_str()).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }
}
