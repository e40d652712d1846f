//! # Unified Application Configuration
//!
//! All settings in one structured object, loaded from environment variables
//! (after `.env` has been read with `dotenvy`) and validated section by section.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::OcrConfig;
use crate::settings::{is_supported_language, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use std::env;

/// Bot-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config(
                "Bot token bot ID must be numeric".to_string(),
            ));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Database configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Minimum number of idle connections
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connect_timeout_secs: 30,
            min_connections: 1,
        }
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::Config("Database URL cannot be empty".to_string()));
        }

        let Some((scheme, connection_part)) = self.url.split_once("://") else {
            return Err(AppError::Config(
                "Database URL format is invalid".to_string(),
            ));
        };

        if scheme != "postgresql" && scheme != "postgres" {
            return Err(AppError::Config(
                "Database URL must start with 'postgresql://' or 'postgres://'".to_string(),
            ));
        }

        if !connection_part.contains('@') {
            return Err(AppError::Config(
                "Database URL must contain authentication information".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(AppError::Config("Max connections cannot be 0".to_string()));
        }

        if self.max_connections > 100 {
            return Err(AppError::Config(
                "Max connections cannot be greater than 100".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(AppError::Config("Connect timeout cannot be 0".to_string()));
        }

        if self.connect_timeout_secs > 300 {
            return Err(AppError::Config(
                "Connect timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(AppError::Config(
                "Min connections cannot be greater than max connections".to_string(),
            ));
        }

        Ok(())
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Metrics and health server port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.metrics_port == 0 {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if !self.allow_privileged_ports && self.metrics_port < 1024 {
            return Err(AppError::Config(format!(
                "Metrics port {} is privileged. Set ALLOW_PRIVILEGED_PORTS=true or use port >= 1024",
                self.metrics_port
            )));
        }

        Ok(())
    }
}

/// Scan and conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Language for users without stored settings or a known Telegram language
    pub default_language: String,
    /// Entries shown per `/history` page
    pub history_page_size: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            history_page_size: 10,
        }
    }
}

impl ScanConfig {
    /// Validate scan configuration
    pub fn validate(&self) -> AppResult<()> {
        if !is_supported_language(&self.default_language) {
            return Err(AppError::Config(format!(
                "DEFAULT_LANGUAGE '{}' is not a supported locale",
                self.default_language
            )));
        }

        if !(1..=50).contains(&self.history_page_size) {
            return Err(AppError::Config(
                "HISTORY_PAGE_SIZE must be between 1 and 50".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Bot configuration
    pub bot: BotConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// OCR processing configuration
    pub ocr: OcrConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
    /// Scan defaults
    pub scan: ScanConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        // Load bot configuration
        config.bot.token = env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
            AppError::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        config.bot.http_timeout_secs = env::var("HTTP_CLIENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("HTTP_CLIENT_TIMEOUT_SECS must be a valid number".to_string())
            })?;

        // Load database configuration
        config.database.url = env::var("DATABASE_URL").map_err(|_| {
            AppError::Config("DATABASE_URL environment variable is required".to_string())
        })?;
        config.database.max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DATABASE_MAX_CONNECTIONS must be a valid number".to_string())
            })?;
        config.database.connect_timeout_secs = env::var("DATABASE_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DATABASE_CONNECT_TIMEOUT_SECS must be a valid number".to_string())
            })?;
        config.database.min_connections = env::var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DATABASE_MIN_CONNECTIONS must be a valid number".to_string())
            })?;

        // Load server configuration
        config.server.metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9090".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("METRICS_PORT must be a valid port number".to_string())
            })?;
        config.server.allow_privileged_ports = env::var("ALLOW_PRIVILEGED_PORTS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        // Load OCR configuration
        if let Ok(languages) = env::var("OCR_LANGUAGES") {
            config.ocr.languages = languages;
        }
        if let Ok(model_type) = env::var("OCR_MODEL_TYPE") {
            config.ocr.model_type = model_type.parse()?;
        }
        if let Ok(psm) = env::var("OCR_PSM_MODE") {
            config.ocr.psm_mode = psm.parse()?;
        }
        config.ocr.operation_timeout_secs = env::var("OCR_TIMEOUT_SECS")
            .unwrap_or_else(|_| config.ocr.operation_timeout_secs.to_string())
            .parse()
            .map_err(|_| AppError::Config("OCR_TIMEOUT_SECS must be a valid number".to_string()))?;
        config.ocr.max_file_size = env::var("OCR_MAX_FILE_SIZE")
            .unwrap_or_else(|_| config.ocr.max_file_size.to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("OCR_MAX_FILE_SIZE must be a valid number of bytes".to_string())
            })?;
        if let Ok(words) = env::var("OCR_USER_WORDS_FILE") {
            config.ocr.user_words_file = if words.trim().is_empty() {
                None
            } else {
                Some(words)
            };
        }

        // Load observability configuration
        config.observability = ObservabilityConfig::from_env()?;

        // Load scan defaults
        config.scan.default_language = env::var("DEFAULT_LANGUAGE")
            .unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string())
            .to_lowercase();
        config.scan.history_page_size = env::var("HISTORY_PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| AppError::Config("HISTORY_PAGE_SIZE must be a valid number".to_string()))?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.database.validate()?;
        self.server.validate()?;
        self.ocr.validate()?;
        self.observability.validate()?;
        self.scan.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], db_url=[REDACTED], metrics_port={}, ocr_languages={}, ocr_model={}, ocr_timeout_secs={}, environment={}, default_language={}",
            self.server.metrics_port,
            self.ocr.languages,
            self.ocr.model_type.tessdata_dir(),
            self.ocr.operation_timeout_secs,
            self.observability.environment,
            self.scan.default_language
        )
    }
}
