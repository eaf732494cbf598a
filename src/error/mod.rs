use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    DataApi(#[from] DataApiError),

    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    #[error("Agent runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Tag error: {0}")]
    Tags(#[from] TagError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors from the managed SQL data API transport
#[derive(Debug, Error)]
pub enum DataApiError {
    #[error("Database connection not configured: {message}")]
    Configuration { message: String },

    #[error("Database error executing SQL: {message}")]
    Execution { message: String },

    #[error("Unexpected database response: {message}")]
    Response { message: String },
}

/// Errors reading deployment-stack metadata
#[derive(Debug, Error)]
pub enum StackError {
    #[error("Stack {stack_name} not found")]
    StackNotFound { stack_name: String },

    #[error("{key} not found in stack outputs")]
    MissingOutput { key: String },

    #[error("{name} not found in stack exports")]
    MissingExport { name: String },

    #[error("AWS API error: {message}")]
    Api { message: String },
}

/// Agent runtime API errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Agent runtime unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Workload tag parsing errors
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Invalid tag format: '{pair}'. Expected 'key=value' or 'key:value'")]
    MissingSeparator { pair: String },

    #[error("Invalid tag format: '{pair}'. Key and value cannot be empty")]
    EmptyKeyOrValue { pair: String },
}

/// Chart generation errors
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No hypothesis evaluations available to chart")]
    NoData,

    #[error("Unsupported chart type: {chart_type}")]
    UnsupportedType { chart_type: String },

    #[error("Failed to render chart: {message}")]
    Render { message: String },
}

/// Errors surfaced at the database tool boundary.
///
/// Batch operations raise `Validation` before any statement is built; every
/// transport failure arrives as `Transport`. Tool wrappers convert both into
/// structured results instead of propagating.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Transport(#[from] DataApiError),
}

impl ToolError {
    /// True when the failure was rejected input rather than a transport fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::Validation { .. })
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for data API operations
pub type DataApiResult<T> = Result<T, DataApiError>;

/// Result type alias for stack metadata operations
pub type StackResult<T> = Result<T, StackError>;

/// Result type alias for agent runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result type alias for tool-layer operations
pub type ToolResult<T> = Result<T, ToolError>;
