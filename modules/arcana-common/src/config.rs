use std::env;

use tracing::info;

const DEFAULT_LEDGER_PATH: &str = "data/ledger.db";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,

    // WordPress
    pub wordpress_url: String,
    pub wordpress_username: String,
    pub wordpress_app_password: String,

    // Ledger
    pub ledger_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            wordpress_url: required_env("WORDPRESS_URL"),
            wordpress_username: required_env("WORDPRESS_USERNAME"),
            wordpress_app_password: required_env("WORDPRESS_APP_PASSWORD"),
            ledger_path: env::var("ARCANA_LEDGER_PATH")
                .unwrap_or_else(|_| DEFAULT_LEDGER_PATH.to_string()),
        }
    }

    /// Load a minimal config for statistics mode (ledger only, no API keys).
    pub fn stats_from_env() -> Self {
        Self {
            anthropic_api_key: String::new(),
            wordpress_url: String::new(),
            wordpress_username: String::new(),
            wordpress_app_password: String::new(),
            ledger_path: env::var("ARCANA_LEDGER_PATH")
                .unwrap_or_else(|_| DEFAULT_LEDGER_PATH.to_string()),
        }
    }

    /// Log the non-secret parts of the configuration.
    pub fn log_redacted(&self) {
        info!(
            wordpress_url = %self.wordpress_url,
            wordpress_username = %self.wordpress_username,
            ledger_path = %self.ledger_path,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
