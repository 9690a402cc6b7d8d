//! Persistent stores for URL configurations and URL-to-extractor mappings.
//!
//! Both stores follow the same shape: a `SqlitePool` behind
//! `SqlitePoolOptions::max_connections`, `CREATE TABLE IF NOT EXISTS`
//! migrations run once at construction, `#[derive(FromRow)]` row structs
//! with an `into_X()` conversion method that decodes JSON-as-TEXT columns
//! and parses RFC3339 timestamps.

pub mod url_configuration_store;
pub mod url_mapping_store;

pub use url_configuration_store::UrlConfigurationStore;
pub use url_mapping_store::UrlMappingStore;

/// `DATABASE_URL` defaults to a bare filesystem path (`./url_configurations.db`),
/// but `sqlx`'s `Sqlite` driver parses its connection string as a URL and
/// needs an explicit `sqlite:` scheme (or the literal `sqlite::memory:`).
/// Both stores funnel their constructor argument through this before
/// handing it to `SqlitePoolOptions::connect` so a bare-path default
/// actually opens a database rather than failing to parse as a URL, and
/// `mode=rwc` so the file is created on first run instead of requiring it
/// to pre-exist.
pub(crate) fn normalize_sqlite_url(raw: &str) -> String {
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite://{raw}?mode=rwc")
    }
}
