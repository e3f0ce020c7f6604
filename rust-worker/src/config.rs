//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Malformed values are
//! logged and replaced by their defaults rather than failing startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Transport address domain used when none is configured.
pub const DEFAULT_ADDRESS_SUFFIX: &str = "@s.whatsapp.net";

/// Base of the direct-download URL for drive share links.
pub const DEFAULT_DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Static API key required on every job submission
    pub api_key: Option<String>,

    /// Pacing delay range in milliseconds between sends (min, max)
    pub pacing_delay_ms: (u64, u64),

    /// HTTP request timeout in milliseconds for downloads and gateway calls
    pub request_timeout_ms: u64,

    /// Directory holding uploaded files until they are resolved
    pub upload_dir: PathBuf,

    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,

    /// Number of accepted jobs that may wait for the dispatch worker
    pub dispatch_queue_capacity: usize,

    /// Base URL of the messaging session gateway
    pub transport_url: Option<String>,

    /// Bearer token for the messaging session gateway
    pub transport_token: Option<String>,

    /// Address domain appended to raw recipient numbers
    pub address_suffix: String,

    /// Base of the direct-download URL for drive share links
    pub drive_download_url: String,

    /// Optional list of allowed CORS origins (any origin when unset)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 3000),

            api_key: env::var("API_KEY").ok().filter(|v| !v.is_empty()),

            pacing_delay_ms: parse_range("PACING_DELAY_RANGE_MS", (15_000, 25_000)),

            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", 30_000),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 64 * 1024 * 1024),

            dispatch_queue_capacity: match parse_var("DISPATCH_QUEUE_CAPACITY", 64) {
                0 => {
                    warn!(env_var = "DISPATCH_QUEUE_CAPACITY", "Queue capacity must be positive, using default");
                    64
                }
                n => n,
            },

            transport_url: env::var("TRANSPORT_URL").ok().filter(|v| !v.is_empty()),

            transport_token: env::var("TRANSPORT_TOKEN").ok().filter(|v| !v.is_empty()),

            address_suffix: env::var("ADDRESS_SUFFIX")
                .unwrap_or_else(|_| DEFAULT_ADDRESS_SUFFIX.to_string()),

            drive_download_url: env::var("DRIVE_DOWNLOAD_URL")
                .unwrap_or_else(|_| DEFAULT_DRIVE_DOWNLOAD_URL.to_string()),

            cors_allowed_origins: parse_csv("CORS_ALLOWED_ORIGINS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            api_key: None,
            pacing_delay_ms: (15_000, 25_000),
            request_timeout_ms: 30_000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 64 * 1024 * 1024,
            dispatch_queue_capacity: 64,
            transport_url: None,
            transport_token: None,
            address_suffix: DEFAULT_ADDRESS_SUFFIX.to_string(),
            drive_download_url: DEFAULT_DRIVE_DOWNLOAD_URL.to_string(),
            cors_allowed_origins: None,
        }
    }
}

/// Parse a single value, warning and falling back to `default` when malformed.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a comma-separated range like "15000,25000" into a tuple.
fn parse_range(name: &str, default: (u64, u64)) -> (u64, u64) {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        warn!(env_var = name, value = %raw, "Invalid range format, using default");
        return default;
    }

    let min = parts[0].trim().parse::<u64>();
    let max = parts[1].trim().parse::<u64>();

    match (min, max) {
        (Ok(min), Ok(max)) if min <= max => (min, max),
        _ => {
            warn!(env_var = name, value = %raw, "Invalid range values, using default");
            default
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_valid() {
        env::set_var("BULKMSG_TEST_RANGE", "1000,2000");
        let result = parse_range("BULKMSG_TEST_RANGE", (0, 0));
        assert_eq!(result, (1000, 2000));
        env::remove_var("BULKMSG_TEST_RANGE");
    }

    #[test]
    fn test_parse_range_inverted_falls_back() {
        env::set_var("BULKMSG_TEST_RANGE_INVERTED", "5000,100");
        let result = parse_range("BULKMSG_TEST_RANGE_INVERTED", (15_000, 25_000));
        assert_eq!(result, (15_000, 25_000));
        env::remove_var("BULKMSG_TEST_RANGE_INVERTED");
    }

    #[test]
    fn test_parse_var_valid() {
        env::set_var("BULKMSG_TEST_PORT", " 8081 ");
        assert_eq!(parse_var::<u16>("BULKMSG_TEST_PORT", 3000), 8081);
        env::remove_var("BULKMSG_TEST_PORT");
    }

    #[test]
    fn test_parse_var_malformed_falls_back() {
        env::set_var("BULKMSG_TEST_TIMEOUT", "thirty");
        assert_eq!(parse_var::<u64>("BULKMSG_TEST_TIMEOUT", 30_000), 30_000);
        env::remove_var("BULKMSG_TEST_TIMEOUT");

        env::set_var("BULKMSG_TEST_PORT_RANGE", "70000");
        assert_eq!(parse_var::<u16>("BULKMSG_TEST_PORT_RANGE", 3000), 3000);
        env::remove_var("BULKMSG_TEST_PORT_RANGE");
    }

    #[test]
    fn test_parse_range_default() {
        let result = parse_range("BULKMSG_NONEXISTENT_VAR", (10, 20));
        assert_eq!(result, (10, 20));
    }

    #[test]
    fn test_parse_csv() {
        env::set_var("BULKMSG_TEST_CSV", "https://a.example, ,https://b.example");
        let result = parse_csv("BULKMSG_TEST_CSV");
        assert_eq!(
            result,
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );
        env::remove_var("BULKMSG_TEST_CSV");
    }

    #[test]
    fn test_default_pacing_matches_reference_window() {
        let config = Config::default();
        assert_eq!(config.pacing_delay_ms, (15_000, 25_000));
        assert_eq!(config.address_suffix, "@s.whatsapp.net");
    }
}
