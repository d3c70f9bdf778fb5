use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 400;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// NaN fails `contains`, so it is rejected along with out-of-range values.
const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1..=4096;
const TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=300;

/// Front-end origins allowed to call `/chat` when `CORS_ALLOWED_ORIGINS` is unset.
const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://dadimitris.github.io,https://dadimitris.github.io/ask-and-learn-about-me";

/// Name of the variable holding the provider credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub cors: CorsConfig,
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// `None` when the variable is unset or blank; `/chat` then fails per request.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeConfig {
    /// Replaces the compiled-in knowledge block when set.
    pub path: Option<PathBuf>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the relay settings from `lookup`, which resolves variable names
    /// to raw values. Blank values count as unset.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = EnvReader { lookup };

        let temperature = vars.parse("OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(out_of_range("OPENAI_TEMPERATURE", temperature, "0.0..=1.0"));
        }

        let max_tokens = vars.parse("OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(out_of_range("OPENAI_MAX_TOKENS", max_tokens, "1..=4096"));
        }

        let timeout_secs = vars.parse("PROVIDER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if !TIMEOUT_SECS_RANGE.contains(&timeout_secs) {
            return Err(out_of_range("PROVIDER_TIMEOUT_SECS", timeout_secs, "1..=300"));
        }

        Ok(RelayConfig {
            common,
            provider: ProviderConfig {
                api_key: vars.get(API_KEY_VAR).map(SecretString::new),
                base_url: vars.get_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
                model: vars.get_or("OPENAI_MODEL", DEFAULT_MODEL),
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            },
            cors: CorsConfig {
                allowed_origins: split_origins(
                    &vars.get_or("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
                ),
            },
            knowledge: KnowledgeConfig {
                path: vars.get("KNOWLEDGE_PATH").map(PathBuf::from),
            },
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, `None` when unset or blank.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(val) => val.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "{} has an invalid value '{}': {}",
                    key,
                    val,
                    e
                ))
            }),
            None => Ok(default),
        }
    }
}

fn out_of_range(key: &str, value: impl std::fmt::Display, range: &str) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(
        "{} must be within {}, got {}",
        key,
        range,
        value
    ))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
