use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,

    // Source listing APIs
    pub youtube_api_key: String,
    pub github_token: Option<String>,

    // Review workspace (Notion-style database)
    pub workspace_token: String,
    pub workspace_database_id: String,
    pub workspace_base_url: String,
    pub workspace_api_version: String,

    // Publish collaborators
    pub publish_repo: String,
    pub publish_token: String,
    pub social_webhook_url: Option<String>,
    pub newsletter_webhook_url: Option<String>,

    // Worker
    pub sources_file: String,
    pub discovery_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            youtube_api_key: required_env("YOUTUBE_API_KEY"),
            github_token: env::var("GITHUB_TOKEN").ok(),
            workspace_token: required_env("WORKSPACE_TOKEN"),
            workspace_database_id: required_env("WORKSPACE_DATABASE_ID"),
            workspace_base_url: env::var("WORKSPACE_BASE_URL")
                .unwrap_or_else(|_| "https://api.notion.com/v1".to_string()),
            workspace_api_version: env::var("WORKSPACE_API_VERSION")
                .unwrap_or_else(|_| "2022-06-28".to_string()),
            publish_repo: required_env("PUBLISH_REPO"),
            publish_token: required_env("PUBLISH_TOKEN"),
            social_webhook_url: env::var("SOCIAL_WEBHOOK_URL").ok(),
            newsletter_webhook_url: env::var("NEWSLETTER_WEBHOOK_URL").ok(),
            sources_file: env::var("SOURCES_FILE").unwrap_or_else(|_| "sources.toml".to_string()),
            discovery_interval_secs: env::var("DISCOVERY_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .expect("DISCOVERY_INTERVAL_SECS must be a number"),
        }
    }

    /// Log the non-secret parts of the config at startup.
    pub fn log_redacted(&self) {
        info!(
            publish_repo = self.publish_repo.as_str(),
            workspace_base_url = self.workspace_base_url.as_str(),
            sources_file = self.sources_file.as_str(),
            discovery_interval_secs = self.discovery_interval_secs,
            social = self.social_webhook_url.is_some(),
            newsletter = self.newsletter_webhook_url.is_some(),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
