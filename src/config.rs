//! Environment-driven configuration, collected once at startup.
//!
//! Loaded via `dotenvy`, following riptide-api's pattern of collecting all
//! runtime knobs from environment variables into one struct rather than
//! scattering `std::env::var` calls through handler code.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Process-wide configuration, loaded once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub enable_metrics: bool,
    pub metrics_port: u16,
    /// `<PROVIDER>_API_KEY` entries, keyed by lowercased provider tag.
    pub provider_api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "./url_configurations.db".to_string(),
            bind_addr: "0.0.0.0:4000".parse().expect("default bind addr parses"),
            allowed_origins: vec!["*".to_string()],
            log_level: "INFO".to_string(),
            enable_metrics: true,
            metrics_port: 8001,
            provider_api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, falling back to
    /// spec-mandated defaults for anything unset. Never panics on a
    /// missing variable; only on a malformed `HOST`/`PORT` pair, since
    /// that indicates a deployment error worth failing fast on.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or(defaults.database_url.clone());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);
        let bind_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or(defaults.bind_addr);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or(defaults.allowed_origins.clone());

        let log_level = std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level.clone());

        let enable_metrics = std::env::var("ENABLE_METRICS")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.enable_metrics);

        let metrics_port = std::env::var("METRICS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.metrics_port);

        let provider_api_keys = collect_provider_api_keys();

        Self {
            database_url,
            bind_addr,
            allowed_origins,
            log_level,
            enable_metrics,
            metrics_port,
            provider_api_keys,
        }
    }

    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.provider_api_keys
            .get(&provider.to_lowercase())
            .map(|s| s.as_str())
    }

    /// The two stores live in sibling SQLite files, `url_configurations.db`
    /// and `url_mappings.db` — one `DATABASE_URL` names the former, this
    /// derives the latter by swapping the file stem so a deployment only
    /// has to set one environment variable. `sqlite::memory:` (used by the
    /// in-memory test stores) is returned unchanged since there's no path
    /// to rewrite.
    pub fn mappings_database_url(&self) -> String {
        if self.database_url.starts_with("sqlite::memory:") {
            return self.database_url.clone();
        }
        if self.database_url.contains("url_configurations.db") {
            self.database_url.replace("url_configurations.db", "url_mappings.db")
        } else if let Some(stripped) = self.database_url.strip_suffix(".db") {
            format!("{stripped}_mappings.db")
        } else {
            format!("{}_mappings", self.database_url)
        }
    }
}

/// Scan the environment for `<PROVIDER>_API_KEY` variables. Returns an
/// empty map (not an error) when none are set; providers are only
/// needed for extractors a deployment actually uses.
fn collect_provider_api_keys() -> HashMap<String, String> {
    std::env::vars()
        .filter_map(|(k, v)| {
            k.strip_suffix("_API_KEY")
                .map(|provider| (provider.to_lowercase(), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.database_url, "./url_configurations.db");
        assert_eq!(cfg.bind_addr.port(), 4000);
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);
        assert_eq!(cfg.log_level, "INFO");
        assert!(cfg.enable_metrics);
        assert_eq!(cfg.metrics_port, 8001);
    }
}
