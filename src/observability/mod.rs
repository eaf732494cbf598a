//! Structured logging and agent event capture.
//!
//! Log records render as JSON objects (timestamp, level, component, message,
//! plus structured fields such as agent, execution_id, duration_ms,
//! tool_name, error). Inside a managed container the JSON sink is stdout so
//! the log-collection pipeline can ingest it; locally it is a per-agent file,
//! falling back to stderr when the file cannot be created. A human-readable
//! layer always mirrors to stdout.

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Whether structured logs should go to stdout.
///
/// `CHAOS_AGENT_LOG_TO_STDOUT` overrides in either direction; otherwise a
/// managed-container environment (`AWS_EXECUTION_ENV`) selects stdout so logs
/// reach the collection pipeline.
pub fn log_to_stdout() -> bool {
    match env::var("CHAOS_AGENT_LOG_TO_STDOUT")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "true" | "1" | "yes" => return true,
        "false" | "0" | "no" => return false,
        _ => {}
    }
    env::var("AWS_EXECUTION_ENV").is_ok()
}

/// Log file path for an agent, in the given directory.
pub fn log_file_path(dir: &Path, agent_name: &str) -> PathBuf {
    dir.join(format!("chaos_agent_{agent_name}.log"))
}

/// Select the structured JSON sink for an agent.
pub fn structured_writer(agent_name: &str) -> BoxMakeWriter {
    structured_writer_in(Path::new("."), agent_name)
}

/// Sink selection rooted at `dir`; split out so tests can use a temp dir.
pub fn structured_writer_in(dir: &Path, agent_name: &str) -> BoxMakeWriter {
    if log_to_stdout() {
        return BoxMakeWriter::new(std::io::stdout);
    }

    // The open attempt doubles as the permissions probe.
    let path = log_file_path(dir, agent_name);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(std::io::stderr),
    }
}

/// Initialize tracing: the structured JSON sink plus a human-readable stdout
/// mirror, independent of where the structured records go.
pub fn init_logging(config: &LoggingConfig, agent_name: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_writer(structured_writer(agent_name)))
                .with(fmt::layer().compact().with_writer(std::io::stdout))
                .init();
        }
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().with_writer(std::io::stdout))
                .init();
        }
    }
}

/// Events emitted by the agent runtime while an invocation is in flight.
#[derive(Debug)]
pub enum AgentEvent {
    InvocationStarted {
        execution_id: Option<String>,
    },
    ToolCalled {
        tool_name: String,
    },
    ToolCompleted {
        tool_name: String,
        duration_ms: i64,
    },
    InvocationCompleted {
        execution_id: Option<String>,
        duration_ms: i64,
    },
    InvocationFailed {
        error: String,
    },
}

/// Pass-through callback handler that records agent runtime events as
/// structured log entries. One logger per agent name.
#[derive(Debug, Clone)]
pub struct AgentEventLogger {
    agent: String,
}

impl AgentEventLogger {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn handle(&self, event: &AgentEvent) {
        match event {
            AgentEvent::InvocationStarted { execution_id } => {
                info!(
                    agent = %self.agent,
                    execution_id = execution_id.as_deref().unwrap_or(""),
                    "Agent invocation started"
                );
            }
            AgentEvent::ToolCalled { tool_name } => {
                info!(agent = %self.agent, tool_name = %tool_name, "Tool call dispatched");
            }
            AgentEvent::ToolCompleted {
                tool_name,
                duration_ms,
            } => {
                info!(
                    agent = %self.agent,
                    tool_name = %tool_name,
                    duration_ms = duration_ms,
                    "Tool call completed"
                );
            }
            AgentEvent::InvocationCompleted {
                execution_id,
                duration_ms,
            } => {
                info!(
                    agent = %self.agent,
                    execution_id = execution_id.as_deref().unwrap_or(""),
                    duration_ms = duration_ms,
                    "Agent invocation completed"
                );
            }
            AgentEvent::InvocationFailed { error: message } => {
                error!(agent = %self.agent, error = %message, "Agent invocation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path_pattern() {
        let path = log_file_path(Path::new("/tmp/logs"), "hypothesis-generator");
        assert_eq!(
            path,
            PathBuf::from("/tmp/logs/chaos_agent_hypothesis-generator.log")
        );
    }

    #[test]
    fn test_event_logger_holds_agent_name() {
        let logger = AgentEventLogger::new("chaos-workflow");
        assert_eq!(logger.agent(), "chaos-workflow");
        // Handlers must not panic without a subscriber installed.
        logger.handle(&AgentEvent::ToolCalled {
            tool_name: "get_hypotheses".to_string(),
        });
    }
}
