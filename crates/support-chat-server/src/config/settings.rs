use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub generation: GenerationConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://...` or `memory://` for the in-process store
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    /// Whether an unknown client-supplied session token may seed a new session
    pub allow_client_session_tokens: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "memory://")?
            .set_default("database.pool_max_size", 10)?
            .set_default("database.pool_timeout_seconds", 5)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.issuer", "support-chat")?
            .set_default("auth.audience", "support-chat-clients")?
            .set_default("auth.token_expiration_seconds", 86_400)?
            .set_default("generation.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("generation.api_key", "")?
            .set_default("generation.model", "gemini-1.5-flash")?
            .set_default("generation.timeout_seconds", 30)?
            .set_default("conversation.allow_client_session_tokens", true)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
