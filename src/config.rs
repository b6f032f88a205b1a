//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Well-known navigation destinations the core redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    /// Public home page. Role mismatches and logout land here.
    pub home: String,
    /// Login page. Unauthenticated access to a protected path lands here.
    pub login: String,
    /// Default destination after login/registration when no intent was captured.
    pub landing: String,
    /// Instructor onboarding workflow (instructor role only).
    pub onboarding: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            login: "/login".to_string(),
            landing: "/dashboard".to_string(),
            onboarding: "/dashboard/instructor/onboarding".to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// JSON file holding the persisted token and cached user.
    pub credentials_path: PathBuf,
    /// libSQL database for local onboarding step drafts.
    pub drafts_db_path: PathBuf,
    /// Backend base URL. `None` selects the built-in mock backend.
    pub api_base_url: Option<String>,
    /// Upper bound on identity verification during session restore.
    pub init_timeout: Duration,
    /// Per-request timeout for the HTTP backend.
    pub request_timeout: Duration,
    /// Simulated latency of the mock backend.
    pub mock_latency: Duration,
    /// Verify a cached token with the auth service when no cached user exists.
    pub verify_cached_token: bool,
    pub routes: RouteConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("./data/credentials.json"),
            drafts_db_path: PathBuf::from("./data/onboarding.db"),
            api_base_url: None,
            init_timeout: Duration::from_millis(3000),
            request_timeout: Duration::from_millis(10_000),
            mock_latency: Duration::from_millis(800),
            verify_cached_token: true,
            routes: RouteConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Build a config from `TUTORLY_*` environment variables.
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let credentials_path = std::env::var("TUTORLY_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.credentials_path);

        let drafts_db_path = std::env::var("TUTORLY_DRAFTS_DB")
            .map(PathBuf::from)
            .unwrap_or(defaults.drafts_db_path);

        let api_base_url = std::env::var("TUTORLY_API_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let init_timeout = env_millis("TUTORLY_INIT_TIMEOUT_MS").unwrap_or(defaults.init_timeout);
        let request_timeout =
            env_millis("TUTORLY_REQUEST_TIMEOUT_MS").unwrap_or(defaults.request_timeout);
        let mock_latency = env_millis("TUTORLY_MOCK_LATENCY_MS").unwrap_or(defaults.mock_latency);

        let verify_cached_token = std::env::var("TUTORLY_VERIFY_TOKEN")
            .ok()
            .and_then(|s| {
                let parsed = parse_bool(&s);
                if parsed.is_none() {
                    warn!(key = "TUTORLY_VERIFY_TOKEN", value = %s, "Not a boolean, using default");
                }
                parsed
            })
            .unwrap_or(defaults.verify_cached_token);

        Self {
            credentials_path,
            drafts_db_path,
            api_base_url,
            init_timeout,
            request_timeout,
            mock_latency,
            verify_cached_token,
            routes: defaults.routes,
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| parse_millis(key, &s))
}

fn parse_millis(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            warn!(key, value, error = %e, "Invalid millisecond value, using default");
            None
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
