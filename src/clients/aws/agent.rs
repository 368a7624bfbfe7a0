use async_trait::async_trait;
use aws_sdk_bedrockagent as bedrockagent;
use tracing::{debug, instrument};

use super::describe;
use crate::core::{Agent, AgentControlClient, AgentStatus, CreateAgentRequest};
use crate::error::AgentError;

#[derive(Clone, Debug)]
pub struct AwsAgentControl {
    client: bedrockagent::Client,
}

impl AwsAgentControl {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: bedrockagent::Client::new(config),
        }
    }

    pub fn from_client(client: bedrockagent::Client) -> Self {
        Self { client }
    }
}

fn agent_from_sdk(agent: &bedrockagent::types::Agent) -> Agent {
    let status = AgentStatus::from(agent.agent_status().as_str());
    let version = agent.agent_version();
    Agent {
        id: agent.agent_id().to_string(),
        name: agent.agent_name().to_string(),
        model_id: agent.foundation_model().unwrap_or_default().to_string(),
        instruction: agent.instruction().unwrap_or_default().to_string(),
        role_arn: agent.agent_resource_role_arn().to_string(),
        version: (status == AgentStatus::Prepared && !version.is_empty()).then(|| version.to_string()),
        status,
    }
}

#[async_trait]
impl AgentControlClient for AwsAgentControl {
    #[instrument(target = "bedrock_agent_runner::aws", skip(self, request), fields(agent = %request.name))]
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent, AgentError> {
        debug!(model = %request.model_id, "CreateAgent");
        let output = self
            .client
            .create_agent()
            .agent_name(&request.name)
            .foundation_model(&request.model_id)
            .instruction(&request.instruction)
            .agent_resource_role_arn(&request.role_arn)
            .send()
            .await
            .map_err(|err| AgentError::Api(describe(&err)))?;

        output
            .agent()
            .map(agent_from_sdk)
            .ok_or_else(|| AgentError::MalformedResponse("CreateAgent returned no agent".to_string()))
    }

    #[instrument(target = "bedrock_agent_runner::aws", skip(self))]
    async fn get_agent(&self, agent_id: &str) -> Result<Agent, AgentError> {
        let output = self
            .client
            .get_agent()
            .agent_id(agent_id)
            .send()
            .await
            .map_err(|err| AgentError::Api(describe(&err)))?;

        output
            .agent()
            .map(agent_from_sdk)
            .ok_or_else(|| AgentError::MalformedResponse("GetAgent returned no agent".to_string()))
    }

    #[instrument(target = "bedrock_agent_runner::aws", skip(self))]
    async fn prepare_agent(&self, agent_id: &str) -> Result<String, AgentError> {
        debug!("PrepareAgent");
        let output = self
            .client
            .prepare_agent()
            .agent_id(agent_id)
            .send()
            .await
            .map_err(|err| AgentError::Api(describe(&err)))?;

        let version = output.agent_version();
        if version.is_empty() {
            return Err(AgentError::MalformedResponse("PrepareAgent returned no version".to_string()));
        }
        Ok(version.to_string())
    }
}
