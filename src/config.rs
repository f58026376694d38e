use std::time::Duration;

use anyhow::Context;
use clap::Args;

use crate::collaborator::{GeminiCollaborator, DEFAULT_ENDPOINT, DEFAULT_MODEL};

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// API key for the generative collaborator
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for insight generation
    #[arg(long, env = "INSIGHTS_MODEL", global = true, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the generative collaborator
    #[arg(long, env = "INSIGHTS_ENDPOINT", global = true, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Request timeout in seconds (none by default)
    #[arg(long, env = "INSIGHTS_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }

    pub fn collaborator(&self) -> anyhow::Result<GeminiCollaborator> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("GEMINI_API_KEY must be set to request insights")?;

        let collaborator = GeminiCollaborator::new(
            &self.endpoint,
            &self.model,
            api_key,
            self.timeout_secs.map(Duration::from_secs),
        )?;
        Ok(collaborator)
    }
}
