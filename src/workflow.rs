//! The end-to-end run: role, agent, prepare, invoke.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::access::AccessProvisioner;
use crate::config::WorkflowConfig;
use crate::core::{Agent, AgentControlClient, AgentRuntimeClient, IdentityClient, InvocationSession, PreparedAgent, Role};
use crate::error::WorkflowError;
use crate::interceptors::Interceptor;
use crate::invocation::InvocationClient;
use crate::lifecycle::AgentLifecycle;

/// What one successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    pub role: Role,
    pub agent: Agent,
    pub prepared: PreparedAgent,
    pub alias_id: String,
    pub response: String,
}

/// Strictly sequential composition of the three components. Each step's
/// output feeds the next, and the first error ends the run without any
/// cleanup of resources already created.
#[derive(Debug)]
pub struct AgentWorkflow<I, C, R>
where
    I: IdentityClient,
    C: AgentControlClient,
    R: AgentRuntimeClient,
{
    config: WorkflowConfig,
    access: AccessProvisioner<I>,
    lifecycle: AgentLifecycle<C>,
    invocation: InvocationClient<R>,
    interceptor: Option<Box<dyn Interceptor>>,
}

impl<I, C, R> AgentWorkflow<I, C, R>
where
    I: IdentityClient,
    C: AgentControlClient,
    R: AgentRuntimeClient,
{
    pub fn new(config: WorkflowConfig, identity: I, control: C, runtime: R) -> Self {
        let access = AccessProvisioner::new(identity, config.role_description.clone());
        let lifecycle = AgentLifecycle::new(control, config.poll.clone());
        let invocation = InvocationClient::new(runtime);
        Self {
            config,
            access,
            lifecycle,
            invocation,
            interceptor: None,
        }
    }

    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Box<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<WorkflowReport, WorkflowError> {
        self.run_with(|_| {}).await
    }

    /// Run every step, forwarding streamed answer text to `on_text`.
    #[instrument(target = "bedrock_agent_runner::workflow", skip(self, on_text), fields(agent = %self.config.agent_name, region = %self.config.region))]
    pub async fn run_with<F>(&self, on_text: F) -> Result<WorkflowReport, WorkflowError>
    where
        F: FnMut(&str) + Send,
    {
        let config = &self.config;
        config.validate()?;

        let role = self
            .access
            .ensure_role(&config.role_name, &config.trust_principal, &config.policy_name, &config.model_arn())
            .await?;
        info!(arn = %role.arn, "Using agent role");

        let agent = self
            .lifecycle
            .create_agent(&config.agent_name, &config.foundation_model, &config.instruction, &role.arn)
            .await?;

        let prepared = self.lifecycle.prepare_agent(&agent.id).await?;

        let alias_id = config.alias_id.clone().unwrap_or_else(|| prepared.version.clone());
        let response = self
            .invocation
            .invoke_with(&agent.id, &alias_id, &config.session_id, &config.question, on_text)
            .await?;

        if let Some(interceptor) = &self.interceptor {
            let session = InvocationSession {
                agent_id: agent.id.clone(),
                alias_id: alias_id.clone(),
                session_id: config.session_id.clone(),
                input_text: config.question.clone(),
            };
            if let Err(e) = interceptor.save(&session, &response).await {
                warn!(error = %e, "Failed to save transcript");
            }
        }

        Ok(WorkflowReport {
            role,
            agent,
            prepared,
            alias_id,
            response,
        })
    }
}
