//! Data model and remote collaborator traits.
//!
//! Every record here mirrors remote state for the duration of one call; nothing
//! is owned or persisted locally. The three traits are the only seams to the
//! cloud: production code plugs in the AWS SDK adapters from `clients::aws`,
//! tests plug in the scripted doubles from `clients::mock`.

use std::fmt;
use std::fmt::Debug;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use serde::{Serialize, Serializer};

use crate::error::{AgentError, IamError, RuntimeError};

/// Ordered, single-pass stream of fragments from one invocation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment, RuntimeError>> + Send>>;

/// Permission document attached directly to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinePolicy {
    pub name: String,
    pub document: String,
}

/// An IAM role as seen by this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: String,
    /// Remote-assigned reference (ARN).
    pub arn: String,
    /// Trust document as returned by the service, when it returned one.
    pub trust_policy: Option<String>,
    /// Inline policies attached during this run.
    pub inline_policies: Vec<InlinePolicy>,
}

/// Lifecycle status of a managed agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentStatus {
    Creating,
    Preparing,
    Prepared,
    NotPrepared,
    Updating,
    Versioning,
    Deleting,
    Deleted,
    Failed,
    /// Any status this crate does not know by name; treated as intermediate.
    Other(String),
}

impl AgentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Preparing => "PREPARING",
            Self::Prepared => "PREPARED",
            Self::NotPrepared => "NOT_PREPARED",
            Self::Updating => "UPDATING",
            Self::Versioning => "VERSIONING",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::Failed => "FAILED",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Statuses from which preparation can never succeed.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Deleted)
    }
}

impl From<&str> for AgentStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "CREATING" => Self::Creating,
            "PREPARING" => Self::Preparing,
            "PREPARED" => Self::Prepared,
            "NOT_PREPARED" => Self::NotPrepared,
            "UPDATING" => Self::Updating,
            "VERSIONING" => Self::Versioning,
            "DELETING" => Self::Deleting,
            "DELETED" => Self::Deleted,
            "FAILED" => Self::Failed,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Serialized as the service's wire name, e.g. `"PREPARED"`.
impl Serialize for AgentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A managed conversational agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub instruction: String,
    pub role_arn: String,
    pub status: AgentStatus,
    /// Set once the agent has been prepared.
    pub version: Option<String>,
}

/// Parameters for the remote create-agent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAgentRequest {
    pub name: String,
    pub model_id: String,
    pub instruction: String,
    pub role_arn: String,
}

/// Result of a successful `prepare_agent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedAgent {
    pub agent_id: String,
    pub version: String,
    pub status: AgentStatus,
    /// Number of status reads performed while polling.
    pub status_reads: u32,
}

/// One invocation of a prepared agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSession {
    pub agent_id: String,
    pub alias_id: String,
    pub session_id: String,
    pub input_text: String,
}

/// One unit of a streamed agent response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// Answer text, still undecoded.
    Text(Bytes),
    /// Diagnostic record; never part of the answer.
    Trace(String),
}

impl StreamFragment {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(Bytes::from(s.into()))
    }
}

/// Identity API: roles and inline policies.
#[async_trait]
pub trait IdentityClient: Send + Sync + Debug {
    /// Fails with `IamError::EntityAlreadyExists` when the role name is taken.
    async fn create_role(&self, name: &str, trust_document: &str, description: &str) -> Result<Role, IamError>;

    async fn get_role(&self, name: &str) -> Result<Role, IamError>;

    /// Creates or replaces the named inline policy on the role.
    async fn put_role_policy(&self, role_name: &str, policy_name: &str, document: &str) -> Result<(), IamError>;
}

/// Agent-control API: create, describe, prepare.
#[async_trait]
pub trait AgentControlClient: Send + Sync + Debug {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent, AgentError>;

    async fn get_agent(&self, agent_id: &str) -> Result<Agent, AgentError>;

    /// Returns the version identifier assigned by the prepare call.
    async fn prepare_agent(&self, agent_id: &str) -> Result<String, AgentError>;
}

/// Agent-runtime API: streaming invocation.
#[async_trait]
pub trait AgentRuntimeClient: Send + Sync + Debug {
    async fn invoke_agent(&self, session: &InvocationSession) -> Result<FragmentStream, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(AgentStatus::from("prepared"), AgentStatus::Prepared);
        assert_eq!(AgentStatus::from("NOT_PREPARED"), AgentStatus::NotPrepared);
        assert_eq!("FAILED".parse::<AgentStatus>().unwrap(), AgentStatus::Failed);
    }

    #[test]
    fn unknown_status_keeps_its_name() {
        let status = AgentStatus::from("MIGRATING");
        assert_eq!(status, AgentStatus::Other("MIGRATING".to_string()));
        assert_eq!(status.to_string(), "MIGRATING");
        assert!(!status.is_terminal_failure());
    }

    #[test]
    fn status_serializes_as_wire_name() {
        assert_eq!(serde_json::to_string(&AgentStatus::NotPrepared).unwrap(), "\"NOT_PREPARED\"");
        assert_eq!(serde_json::to_string(&AgentStatus::from("MIGRATING")).unwrap(), "\"MIGRATING\"");
    }

    #[test]
    fn only_failed_and_deleted_are_terminal_failures() {
        assert!(AgentStatus::Failed.is_terminal_failure());
        assert!(AgentStatus::Deleted.is_terminal_failure());
        assert!(!AgentStatus::Deleting.is_terminal_failure());
        assert!(!AgentStatus::Creating.is_terminal_failure());
        assert!(!AgentStatus::Prepared.is_terminal_failure());
    }
}
