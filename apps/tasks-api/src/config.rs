use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_or_default, env_parse_or, server::ServerConfig,
};
use domain_tasks::TaskServiceConfig;
use domain_tasks::query::DEFAULT_MAX_PAGE_SIZE;
use std::env;
use std::path::PathBuf;

// Import MongoDB config from the database library
use database::mongodb::MongoConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

pub const DEFAULT_UPLOAD_DIR: &str = "public/images";
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Where uploaded images go and how large a request may be
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl FromEnv for UploadConfig {
    /// - UPLOAD_DIR: defaults to `public/images`
    /// - UPLOAD_MAX_BYTES: defaults to 10 MiB
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dir: PathBuf::from(env_or_default("UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            max_bytes: env_parse_or("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
        })
    }
}

/// Task API behaviour switches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TasksConfig {
    pub max_page_size: u64,
    pub legacy_stats_labels: bool,
    pub public_base_url: Option<String>,
    pub trust_forwarded_headers: bool,
}

impl FromEnv for TasksConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_page_size = env_parse_or("TASKS_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;
        if max_page_size == 0 {
            return Err(ConfigError::ParseError {
                key: "TASKS_MAX_PAGE_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            max_page_size,
            legacy_stats_labels: env_parse_or("TASKS_LEGACY_STATS_LABELS", false)?,
            public_base_url,
            trust_forwarded_headers: env_parse_or("TRUST_FORWARDED_HEADERS", false)?,
        })
    }
}

impl From<&TasksConfig> for TaskServiceConfig {
    fn from(config: &TasksConfig) -> Self {
        Self {
            max_page_size: config.max_page_size,
            legacy_stats_labels: config.legacy_stats_labels,
            public_base_url: config.public_base_url.clone(),
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub tasks: TasksConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?;
        let server = ServerConfig::from_env()?;
        let upload = UploadConfig::from_env()?;
        let tasks = TasksConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            mongodb,
            server,
            upload,
            tasks,
            environment,
        })
    }
}
