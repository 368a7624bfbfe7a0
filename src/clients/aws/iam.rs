use async_trait::async_trait;
use aws_sdk_iam as iam;
use tracing::{debug, instrument};

use super::describe;
use crate::core::{IdentityClient, Role};
use crate::error::IamError;

#[derive(Clone, Debug)]
pub struct AwsIdentity {
    client: iam::Client,
}

impl AwsIdentity {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: iam::Client::new(config),
        }
    }

    pub fn from_client(client: iam::Client) -> Self {
        Self { client }
    }
}

fn role_from_sdk(role: &iam::types::Role) -> Role {
    Role {
        name: role.role_name().to_string(),
        arn: role.arn().to_string(),
        trust_policy: role.assume_role_policy_document().map(str::to_string),
        inline_policies: Vec::new(),
    }
}

#[async_trait]
impl IdentityClient for AwsIdentity {
    #[instrument(target = "bedrock_agent_runner::aws", skip(self, trust_document, description))]
    async fn create_role(&self, name: &str, trust_document: &str, description: &str) -> Result<Role, IamError> {
        debug!(role = %name, "CreateRole");
        let output = self
            .client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(trust_document)
            .description(description)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_entity_already_exists_exception() => IamError::EntityAlreadyExists(name.to_string()),
                _ => IamError::Api(describe(&err)),
            })?;

        output
            .role()
            .map(role_from_sdk)
            .ok_or_else(|| IamError::MalformedResponse("CreateRole returned no role".to_string()))
    }

    #[instrument(target = "bedrock_agent_runner::aws", skip(self))]
    async fn get_role(&self, name: &str) -> Result<Role, IamError> {
        debug!(role = %name, "GetRole");
        let output = self
            .client
            .get_role()
            .role_name(name)
            .send()
            .await
            .map_err(|err| IamError::Api(describe(&err)))?;

        output
            .role()
            .map(role_from_sdk)
            .ok_or_else(|| IamError::MalformedResponse("GetRole returned no role".to_string()))
    }

    #[instrument(target = "bedrock_agent_runner::aws", skip(self, document))]
    async fn put_role_policy(&self, role_name: &str, policy_name: &str, document: &str) -> Result<(), IamError> {
        debug!(role = %role_name, policy = %policy_name, "PutRolePolicy");
        self.client
            .put_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .policy_document(document)
            .send()
            .await
            .map_err(|err| IamError::Api(describe(&err)))?;
        Ok(())
    }
}
