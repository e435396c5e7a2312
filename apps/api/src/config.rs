use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::batch::BatchErrorPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub batch: BatchSettings,
    pub providers: ProviderSettings,
    pub tesseract_path: String,
}

/// Knobs for the upload batch scheduler.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub rate_limit_per_minute: u32,
    pub error_policy: BatchErrorPolicy,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 4,
            rate_limit_per_minute: 12,
            error_policy: BatchErrorPolicy::StopAfterFailedGroup,
        }
    }
}

/// Credentials and model names for the external text-generation providers.
/// Missing keys are allowed; the affected provider fails at call time.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub nvidia_api_key: String,
    pub nvidia_base_url: String,
    pub deepseek_model: String,
    pub llama_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let batch = BatchSettings {
            batch_size: parse_env("BATCH_SIZE", 4)?,
            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 12)?,
            error_policy: parse_env("BATCH_ERROR_POLICY", BatchErrorPolicy::StopAfterFailedGroup)?,
        };
        if batch.batch_size == 0 {
            bail!("BATCH_SIZE must be at least 1");
        }
        if batch.rate_limit_per_minute == 0 {
            bail!("RATE_LIMIT_PER_MINUTE must be at least 1");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: parse_env("PORT", 3000)?,
            rust_log: optional_env("RUST_LOG", "info"),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            batch,
            providers: ProviderSettings {
                gemini_api_key: optional_env("GEMINI_API_KEY", ""),
                gemini_model: optional_env("GEMINI_MODEL", "gemini-1.5-flash"),
                openai_api_key: optional_env("OPENAI_API_KEY", ""),
                openai_model: optional_env("CHATGPT_MODEL", "gpt-4o"),
                nvidia_api_key: optional_env("NVIDIA_API_KEY", ""),
                nvidia_base_url: optional_env(
                    "NVIDIA_BASE_URL",
                    "https://integrate.api.nvidia.com/v1",
                ),
                deepseek_model: optional_env("DEEPSEEK_MODEL", "deepseek-ai/deepseek-r1"),
                llama_model: optional_env("LLAMA_MODEL", "meta/llama-3.3-70b-instruct"),
            },
            tesseract_path: optional_env("TESSERACT_PATH", "tesseract"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ('{raw}'): {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_batch_settings_match_rate_ceiling() {
        let settings = BatchSettings::default();
        assert_eq!(settings.batch_size, 4);
        assert_eq!(settings.rate_limit_per_minute, 12);
        assert_eq!(settings.error_policy, BatchErrorPolicy::StopAfterFailedGroup);
    }

    #[test]
    fn test_parse_env_falls_back_to_default_when_unset() {
        let value: u16 = parse_env("RESUME_API_TEST_SURELY_UNSET_PORT", 4242).unwrap();
        assert_eq!(value, 4242);
    }
}
