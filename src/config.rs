use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::generation_service::MAX_BATCH_COUNT;
use crate::llm_providers::LLMProviderType;
use crate::seeder::{DEFAULT_SEED_BATCH_SIZE, DEFAULT_SEED_THRESHOLD};

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub generation: GenerationConfig,
    pub seeding: SeedingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Question generation backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on simultaneous calls into the question generator
    pub max_concurrent: usize,
}

/// Startup seeding of an empty quiz library
#[derive(Debug, Clone, Deserialize)]
pub struct SeedingConfig {
    pub enabled: bool,
    pub threshold: u64,
    pub batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            llm: LLMConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            generation: GenerationConfig::from_env()?,
            seeding: SeedingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            max_concurrent_generations = self.generation.max_concurrent,
            seeding_enabled = self.seeding.enabled,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.generation.max_concurrent == 0 {
            return Err(anyhow!("GENERATION_MAX_CONCURRENT must be greater than 0"));
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == "your-api-key" {
            warn!("LLM API key appears to be placeholder or empty - quiz generation will fail");
        }

        if self.seeding.batch_size > MAX_BATCH_COUNT {
            warn!(
                batch_size = self.seeding.batch_size,
                max = MAX_BATCH_COUNT,
                "Seed batch size exceeds the batch cap, it will be clamped"
            );
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
            && !self.logging.level.contains('=')
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:quiz_generator.db".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY").unwrap_or_else(|_| "your-api-key".to_string());

        let base_url = env::var("LLM_BASE_URL").ok();

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = LLMProviderType::parse(&provider_str).unwrap_or_else(|| {
            info!("Unknown LLM provider '{}', defaulting to Gemini", provider_str);
            LLMProviderType::Gemini
        });

        let model = env::var("LLM_MODEL").ok();

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl LoggingConfig {
    /// Read on its own so the subscriber is installed before the rest of the config loads
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,quiz_generator=debug".to_string());

        let file_enabled = parse_bool_var("LOG_FILE_ENABLED", true);
        let console_enabled = parse_bool_var("LOG_CONSOLE_ENABLED", true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

impl GenerationConfig {
    fn from_env() -> Result<Self> {
        let max_concurrent = parse_number_var("GENERATION_MAX_CONCURRENT", MAX_BATCH_COUNT)?;

        Ok(GenerationConfig { max_concurrent })
    }
}

impl SeedingConfig {
    fn from_env() -> Result<Self> {
        Ok(SeedingConfig {
            enabled: parse_bool_var("SEED_ENABLED", true),
            threshold: parse_number_var("SEED_THRESHOLD", DEFAULT_SEED_THRESHOLD)?,
            batch_size: parse_number_var("SEED_BATCH_SIZE", DEFAULT_SEED_BATCH_SIZE)?,
        })
    }
}

fn parse_bool_var(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_number_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'. Must be a non-negative number", name, value)),
        Err(_) => Ok(default),
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            llm: LLMConfig {
                api_key: "valid-key-123".to_string(),
                base_url: None,
                provider: LLMProviderType::Gemini,
                model: None,
            },
            server: ServerConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
            generation: GenerationConfig { max_concurrent: 10 },
            seeding: SeedingConfig {
                enabled: true,
                threshold: 5,
                batch_size: 3,
            },
        }
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:quiz_generator.db"), "sqli***r.db");
        assert_eq!(mask_sensitive_data("AIzaSyExampleKey42"), "AIza***ey42");
    }

    #[test]
    fn test_config_validation() {
        let config = valid_config();
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.database.url = "postgres://localhost/quiz".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.generation.max_concurrent = 0;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_parse_number_var() {
        unsafe { env::set_var("QUIZ_TEST_NUMBER", " 7 "); }
        assert_eq!(parse_number_var::<usize>("QUIZ_TEST_NUMBER", 3).unwrap(), 7);

        unsafe { env::set_var("QUIZ_TEST_NUMBER", "seven"); }
        assert!(parse_number_var::<usize>("QUIZ_TEST_NUMBER", 3).is_err());

        unsafe { env::remove_var("QUIZ_TEST_NUMBER"); }
        assert_eq!(parse_number_var::<usize>("QUIZ_TEST_NUMBER", 3).unwrap(), 3);
    }

    #[test]
    fn test_logging_config_loads_without_other_settings() {
        unsafe {
            env::set_var("LOG_DIRECTORY", "/tmp/quiz-generator-logs");
            env::set_var("LOG_FILE_ENABLED", "false");
        }

        let logging = LoggingConfig::from_env().unwrap();
        assert_eq!(logging.log_directory, "/tmp/quiz-generator-logs");
        assert!(!logging.file_enabled);

        unsafe {
            env::remove_var("LOG_DIRECTORY");
            env::remove_var("LOG_FILE_ENABLED");
        }
    }

    #[test]
    fn test_parse_bool_var() {
        unsafe { env::set_var("QUIZ_TEST_FLAG", "false"); }
        assert!(!parse_bool_var("QUIZ_TEST_FLAG", true));

        unsafe { env::set_var("QUIZ_TEST_FLAG", "not-a-bool"); }
        assert!(parse_bool_var("QUIZ_TEST_FLAG", true));

        unsafe { env::remove_var("QUIZ_TEST_FLAG"); }
        assert!(!parse_bool_var("QUIZ_TEST_FLAG", false));
    }
}
