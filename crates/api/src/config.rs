use std::fmt::Display;
use std::str::FromStr;

use dancegen_core::recovery::{DEFAULT_MAX_GUESS_ATTEMPTS, DEFAULT_STUCK_THRESHOLD_SECS};
use dancegen_core::store::DEFAULT_TTL_SECS;
use dancegen_kie::endpoints::max_status_candidates;
use dancegen_kie::KieConfig;

/// Default deadline for one poll-time resolution, kept below the default
/// `REQUEST_TIMEOUT_SECS` so pollers get a JSON answer instead of a 408.
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 25;

/// Default history pages scanned per poll.
pub const DEFAULT_HISTORY_MAX_PAGES: u32 = 5;

/// Default storage URL pattern probed for stuck tasks.
pub const DEFAULT_URL_GUESS_TEMPLATE: &str =
    "https://tempfile.aiquickdraw.com/s/{task_id}_{candidate}_{timestamp}.png";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server drains (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres URL. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub cache: CacheConfig,
    pub reconcile: ReconcileConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset                      |
    ///
    /// See [`CacheConfig::from_env`] and [`ReconcileConfig::from_env`] for
    /// the nested sections.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            cache: CacheConfig::from_env(),
            reconcile: ReconcileConfig::from_env(),
        }
    }

    /// Check settings that only make sense together. `main` panics on error
    /// so misconfiguration fails at startup.
    ///
    /// The resolve deadline must end before the server-wide request timeout,
    /// and a status query that times out on every candidate must still fit
    /// inside the resolve deadline.
    pub fn validate(&self, kie: &KieConfig) -> Result<(), String> {
        self.cache.validate()?;

        let deadline = self.reconcile.resolve_timeout_secs;
        if deadline == 0 || deadline >= self.request_timeout_secs {
            return Err(format!(
                "RESOLVE_TIMEOUT_SECS ({deadline}) must be at least 1 and below \
                 REQUEST_TIMEOUT_SECS ({})",
                self.request_timeout_secs
            ));
        }

        let candidates = max_status_candidates() as u64;
        let worst_case = kie.request_timeout_secs.saturating_mul(candidates);
        if worst_case > deadline {
            return Err(format!(
                "KIE_REQUEST_TIMEOUT_SECS ({}) x {candidates} status candidates = {worst_case}s \
                 does not fit in RESOLVE_TIMEOUT_SECS ({deadline})",
                kie.request_timeout_secs
            ));
        }

        Ok(())
    }
}

/// Result cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `CACHE_TTL_SECS`            | `1800`  |
    /// | `CACHE_SWEEP_INTERVAL_SECS` | `300`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_secs: env_or("CACHE_TTL_SECS", defaults.ttl_secs),
            sweep_interval_secs: env_or("CACHE_SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs)
    }

    /// `tokio::time::interval` panics on a zero period.
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs < 1 {
            return Err(format!("CACHE_TTL_SECS ({}) must be at least 1", self.ttl_secs));
        }
        if self.sweep_interval_secs < 1 {
            return Err(format!(
                "CACHE_SWEEP_INTERVAL_SECS ({}) must be at least 1",
                self.sweep_interval_secs
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval_secs: 300,
        }
    }
}

/// Fallback sources consulted when the cache cannot answer a poll.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Deadline for everything past the cache lookup.
    pub resolve_timeout_secs: u64,
    /// Scan the provider's record history for image tasks.
    pub history_scan_enabled: bool,
    pub history_max_pages: u32,
    /// Age after which a non-terminal history record counts as stuck.
    pub stuck_threshold_secs: i64,
    /// Probe guessed storage URLs for stuck tasks. Off unless opted in.
    pub url_guess_enabled: bool,
    pub url_guess_max_attempts: usize,
    pub url_guess_template: String,
    pub url_guess_candidates: Vec<String>,
}

impl ReconcileConfig {
    /// | Env Var                     | Default                                |
    /// |-----------------------------|----------------------------------------|
    /// | `RESOLVE_TIMEOUT_SECS`      | `25`                                   |
    /// | `HISTORY_SCAN_ENABLED`      | `true`                                 |
    /// | `HISTORY_MAX_PAGES`         | `5`                                    |
    /// | `STUCK_TASK_THRESHOLD_SECS` | `600`                                  |
    /// | `URL_GUESS_ENABLED`         | `false`                                |
    /// | `URL_GUESS_MAX_ATTEMPTS`    | `10`                                   |
    /// | `URL_GUESS_TEMPLATE`        | [`DEFAULT_URL_GUESS_TEMPLATE`]         |
    /// | `URL_GUESS_CANDIDATES`      | `0,1,2,3,4`                            |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url_guess_candidates = std::env::var("URL_GUESS_CANDIDATES")
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.url_guess_candidates);

        Self {
            resolve_timeout_secs: env_or("RESOLVE_TIMEOUT_SECS", defaults.resolve_timeout_secs),
            history_scan_enabled: env_or("HISTORY_SCAN_ENABLED", defaults.history_scan_enabled),
            history_max_pages: env_or("HISTORY_MAX_PAGES", defaults.history_max_pages),
            stuck_threshold_secs: env_or("STUCK_TASK_THRESHOLD_SECS", defaults.stuck_threshold_secs),
            url_guess_enabled: env_or("URL_GUESS_ENABLED", defaults.url_guess_enabled),
            url_guess_max_attempts: env_or("URL_GUESS_MAX_ATTEMPTS", defaults.url_guess_max_attempts),
            url_guess_template: std::env::var("URL_GUESS_TEMPLATE")
                .unwrap_or(defaults.url_guess_template),
            url_guess_candidates,
        }
    }

    pub fn stuck_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stuck_threshold_secs)
    }

    pub fn resolve_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolve_timeout_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT_SECS,
            history_scan_enabled: true,
            history_max_pages: DEFAULT_HISTORY_MAX_PAGES,
            stuck_threshold_secs: DEFAULT_STUCK_THRESHOLD_SECS,
            url_guess_enabled: false,
            url_guess_max_attempts: DEFAULT_MAX_GUESS_ATTEMPTS,
            url_guess_template: DEFAULT_URL_GUESS_TEMPLATE.to_string(),
            url_guess_candidates: ["0", "1", "2", "3", "4"].map(String::from).to_vec(),
        }
    }
}

/// Parse `name` when set, panicking on malformed values so misconfiguration
/// fails at startup.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reconcile_defaults() {
        let config = ReconcileConfig::default();
        assert!(config.history_scan_enabled);
        assert!(!config.url_guess_enabled);
        assert_eq!(config.history_max_pages, 5);
        assert_eq!(config.url_guess_max_attempts, 10);
        assert_eq!(config.stuck_threshold(), chrono::Duration::minutes(10));
        assert_eq!(config.url_guess_candidates.len(), 5);
    }

    fn server_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            database_url: None,
            cache: CacheConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }

    #[test]
    fn defaults_fit_their_deadlines() {
        let kie = KieConfig::with_base_url("http://localhost");
        assert_eq!(server_config().validate(&kie), Ok(()));
    }

    #[test]
    fn resolve_deadline_must_end_before_request_timeout() {
        let kie = KieConfig::with_base_url("http://localhost");
        let mut config = server_config();
        config.reconcile.resolve_timeout_secs = 30;
        let err = config.validate(&kie).unwrap_err();
        assert!(err.contains("RESOLVE_TIMEOUT_SECS"), "{err}");

        config.reconcile.resolve_timeout_secs = 0;
        assert!(config.validate(&kie).is_err());
    }

    #[test]
    fn slow_provider_timeout_is_rejected() {
        let mut kie = KieConfig::with_base_url("http://localhost");
        kie.request_timeout_secs = 15;
        let err = server_config().validate(&kie).unwrap_err();
        assert!(err.contains("KIE_REQUEST_TIMEOUT_SECS"), "{err}");
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let cache = CacheConfig {
            sweep_interval_secs: 0,
            ..CacheConfig::default()
        };
        assert!(cache.validate().unwrap_err().contains("CACHE_SWEEP_INTERVAL_SECS"));

        let mut config = server_config();
        config.cache = cache;
        assert!(config
            .validate(&KieConfig::with_base_url("http://localhost"))
            .is_err());
    }

    #[test]
    fn cache_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.sweep_interval_secs, 300);
    }
}
