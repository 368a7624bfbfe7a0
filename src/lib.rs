pub mod access;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod interceptors;
pub mod invocation;
pub mod lifecycle;
pub mod workflow;

// Convenient re-exports
pub use access::AccessProvisioner;
pub use config::WorkflowConfig;
pub use error::WorkflowError;
pub use invocation::InvocationClient;
pub use lifecycle::{AgentLifecycle, Backoff, PollPolicy};
pub use workflow::{AgentWorkflow, WorkflowReport};
