//! Process configuration.
//!
//! Values are layered with figment: built-in defaults, then `RECORDS_*`
//! environment variables, then the raw deployment variables the hosting
//! platform sets (`DATABASE_URL`, `POSTGRES_URL`, `VERCEL`, `APP_ENV`).

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::RecordsError;

/// Deployment variables read without the `RECORDS_` prefix.
const DEPLOYMENT_KEYS: [&str; 4] = ["database_url", "postgres_url", "vercel", "app_env"];

/// Environment names that explicitly opt out of production behaviour.
const NON_PRODUCTION_ENVS: [&str; 3] = ["development", "test", "local"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    pub sqlite_path: PathBuf,
    #[serde(default, deserialize_with = "lossy_string")]
    pub session_secret: Option<String>,
    pub insecure_cookie: bool,

    /// Networked database address.
    pub database_url: Option<String>,
    /// Fallback networked address some platforms inject instead of `DATABASE_URL`.
    pub postgres_url: Option<String>,
    /// Set by the managed deployment platform; only presence matters.
    #[serde(default, deserialize_with = "lossy_string")]
    pub vercel: Option<String>,
    pub app_env: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            loglevel: "info".to_string(),
            sqlite_path: PathBuf::from("students.db"),
            session_secret: None,
            insecure_cookie: false,
            database_url: None,
            postgres_url: None,
            vercel: None,
            app_env: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, RecordsError> {
        Self::figment()
            .extract()
            .map_err(|e| RecordsError::Config(e.to_string()))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("RECORDS_"))
            .merge(Env::raw().only(&DEPLOYMENT_KEYS))
    }

    /// The networked database address, preferring `DATABASE_URL`.
    pub fn networked_url(&self) -> Option<&str> {
        [&self.database_url, &self.postgres_url]
            .into_iter()
            .filter_map(|url| url.as_deref())
            .find(|url| !url.trim().is_empty())
    }

    pub fn on_managed_platform(&self) -> bool {
        self.vercel.is_some()
    }

    pub fn is_production(&self) -> bool {
        self.app_env
            .as_deref()
            .is_some_and(|env| env.eq_ignore_ascii_case("production"))
    }

    /// True only when `APP_ENV` names a development-like environment.
    pub fn explicitly_non_production(&self) -> bool {
        self.app_env.as_deref().is_some_and(|env| {
            NON_PRODUCTION_ENVS
                .iter()
                .any(|candidate| env.eq_ignore_ascii_case(candidate))
        })
    }
}

/// Env values like `VERCEL=1` arrive as numbers; keep them as text.
fn lossy_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("failed to load configuration, falling back to defaults: {e}");
        Config::default()
    })
});
