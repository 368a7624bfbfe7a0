use std::str::Utf8Error;

use thiserror::Error;

use crate::core::AgentStatus;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IAM error: {0}")]
    Iam(#[from] IamError),
    #[error("Agent control error: {0}")]
    Agent(#[from] AgentError),
    #[error("Agent runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Aborted before any remote change was made")]
    Aborted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IamError {
    /// Recovered locally by fetching the existing role.
    #[error("Role already exists: {0}")]
    EntityAlreadyExists(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Agent {agent_id} in unexpected status: {status}")]
    UnexpectedStatus { agent_id: String, status: AgentStatus },
    #[error("Agent {agent_id} not prepared after {attempts} status reads (last status: {last_status})")]
    PollTimeout {
        agent_id: String,
        attempts: u32,
        last_status: AgentStatus,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Fragment is not valid UTF-8: {0}")]
    Decode(#[from] Utf8Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("{0}")]
    FeatureDisabled(String),
}
