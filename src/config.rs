use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::cache::CacheConfig;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-gateway")]
#[command(about = "Caching recipe generation gateway in front of an OpenAI-compatible API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Base URL of the chat-completion API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub ai_base_url: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub ai_model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    // Timeout for one generation call, in seconds
    #[arg(long, default_value_t = 60)]
    pub ai_timeout: u64,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 86400)]
    pub cache_ttl: u64,

    // Max number of cached recipes
    #[arg(long, default_value_t = 1000)]
    pub cache_capacity: usize,

    // Expired-entry sweep interval in seconds, 0 disables
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Key rate limits on X-Forwarded-For; only behind a proxy that sets it
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl),
            capacity: self.cache_capacity,
        }
    }

    pub fn sweep_every(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}
