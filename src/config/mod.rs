use std::env;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::RwLock;
use tracing::{info, warn};

use crate::error::TagError;
use crate::tags::{parse_tags_string, WorkloadTag};

/// Final fallback region when nothing else resolves.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Regions probed for the deployment stack after the caller's default region.
pub const COMMON_REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"];

const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
const SMALL_MODEL_ID: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";
const LARGE_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub request: RequestConfig,
    pub logging: LoggingConfig,
    pub stack_name: String,
}

/// Agent runtime API configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let runtime = RuntimeConfig {
            base_url: env::var("CHAOS_AGENT_RUNTIME_URL")
                .unwrap_or_else(|_| "http://localhost:8170".to_string()),
            api_key: env::var("CHAOS_AGENT_RUNTIME_API_KEY").ok(),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "json".to_string())
                .to_lowercase()
                .as_str()
            {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
        };

        Config {
            runtime,
            request,
            logging,
            stack_name: crate::db::STACK_NAME.to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Locates the deployment stack while resolving the working region.
#[async_trait]
pub trait StackLocator: Send + Sync {
    /// The caller's default region, if one is configured.
    async fn default_region(&self) -> Option<String>;

    /// Whether the named stack exists in the given region.
    async fn stack_exists(&self, stack_name: &str, region: &str) -> bool;
}

/// Per-run context owning the configuration and the lazily resolved settings
/// (region, model ids, workload tags).
///
/// Constructing a fresh context is the only cache reset; there are no
/// process-wide globals.
pub struct AppContext {
    config: Config,
    region_override: Option<String>,
    region: tokio::sync::OnceCell<String>,
    default_model: OnceCell<String>,
    small_model: OnceCell<String>,
    large_model: OnceCell<String>,
    workload_tags: RwLock<Vec<WorkloadTag>>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            region_override: None,
            region: tokio::sync::OnceCell::new(),
            default_model: OnceCell::new(),
            small_model: OnceCell::new(),
            large_model: OnceCell::new(),
            workload_tags: RwLock::new(Vec::new()),
        }
    }

    /// Pin the region explicitly (typically from the CLI). An empty value is
    /// ignored.
    pub fn with_region_override(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        let trimmed = region.trim();
        if trimmed.is_empty() {
            warn!("Ignoring empty region override");
            self.region_override = None;
        } else {
            info!(region = trimmed, "Region override set");
            self.region_override = Some(trimmed.to_string());
        }
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve the AWS region with precedence: explicit override >
    /// environment variables > region where the deployment stack is found >
    /// default. The first successful source wins and is cached for the
    /// context's lifetime.
    pub async fn aws_region(&self, locator: &dyn StackLocator) -> String {
        self.region
            .get_or_init(|| async {
                if let Some(region) = &self.region_override {
                    info!(region = %region, "Using region from CLI override");
                    return region.clone();
                }

                for var in ["CHAOS_AGENT_REGION", "AWS_DEFAULT_REGION", "AWS_REGION"] {
                    if let Ok(region) = env::var(var) {
                        if !region.trim().is_empty() {
                            info!(region = %region, source = var, "Using region from environment");
                            return region;
                        }
                    }
                }

                if let Some(region) =
                    find_stack_region(locator, &self.config.stack_name).await
                {
                    info!(region = %region, "Using region from stack location");
                    return region;
                }

                let fallback = locator
                    .default_region()
                    .await
                    .unwrap_or_else(|| DEFAULT_REGION.to_string());
                warn!(region = %fallback, "Stack not found in any region, using fallback");
                fallback
            })
            .await
            .clone()
    }

    /// Default model id: environment override, then the hard-coded default.
    pub fn default_model(&self) -> String {
        self.default_model
            .get_or_init(|| model_from_env("CHAOS_AGENT_MODEL", DEFAULT_MODEL_ID))
            .clone()
    }

    /// Small/fast model id for analysis tasks.
    pub fn small_model(&self) -> String {
        self.small_model
            .get_or_init(|| model_from_env("CHAOS_AGENT_SMALL_MODEL", SMALL_MODEL_ID))
            .clone()
    }

    /// Large/quality model id for complex reasoning.
    pub fn large_model(&self) -> String {
        self.large_model
            .get_or_init(|| model_from_env("CHAOS_AGENT_LARGE_MODEL", LARGE_MODEL_ID))
            .clone()
    }

    /// Parse and store workload tags for resource filtering.
    pub fn set_workload_tags_from_str(&self, tags: &str) -> Result<(), TagError> {
        let parsed = parse_tags_string(tags)?;
        info!(tags = ?parsed, "Workload tags set");
        let mut guard = self
            .workload_tags
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *guard = parsed;
        Ok(())
    }

    /// Workload tags for resource filtering; empty means no filtering.
    pub fn workload_tags(&self) -> Vec<WorkloadTag> {
        self.workload_tags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn model_from_env(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(model) if !model.trim().is_empty() => {
            info!(model = %model, source = var, "Using model from environment");
            model
        }
        _ => {
            info!(model = default, "Using default model");
            default.to_string()
        }
    }
}

/// Probe for the region hosting the deployment stack: the caller's default
/// region first, then the common-region shortlist.
async fn find_stack_region(locator: &dyn StackLocator, stack_name: &str) -> Option<String> {
    let current = locator.default_region().await;

    if let Some(region) = &current {
        if locator.stack_exists(stack_name, region).await {
            return Some(region.clone());
        }
    }

    for region in COMMON_REGIONS {
        if Some(*region) == current.as_deref() {
            continue;
        }
        if locator.stack_exists(stack_name, region).await {
            return Some((*region).to_string());
        }
    }

    None
}
