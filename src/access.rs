//! Access provisioning: make sure the execution role exists, trusts the agent
//! service, and may invoke exactly one foundation model.

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::core::{IdentityClient, InlinePolicy, Role};
use crate::error::IamError;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Trust document allowing `principal` (a service principal such as
/// `bedrock.amazonaws.com`) to assume the role.
pub fn trust_policy_document(principal: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "Service": principal },
                "Action": "sts:AssumeRole"
            }
        ]
    })
    .to_string()
}

/// Inline policy granting model invocation on a single model resource.
pub fn invoke_model_policy_document(model_arn: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [
            {
                "Effect": "Allow",
                "Action": "bedrock:InvokeModel",
                "Resource": model_arn
            }
        ]
    })
    .to_string()
}

#[derive(Debug, Clone)]
pub struct AccessProvisioner<C: IdentityClient> {
    client: C,
    description: String,
}

impl<C: IdentityClient> AccessProvisioner<C> {
    pub fn new(client: C, description: impl Into<String>) -> Self {
        Self {
            client,
            description: description.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create the role, or reuse it if the name is already taken, then attach
    /// (create or replace) the invoke-model inline policy.
    ///
    /// Not transactional: if attaching the policy fails the role is left
    /// behind without permissions, and the next call repairs it through the
    /// reuse path.
    #[instrument(target = "bedrock_agent_runner::access", skip(self))]
    pub async fn ensure_role(
        &self,
        role_name: &str,
        trust_principal: &str,
        policy_name: &str,
        allowed_model_arn: &str,
    ) -> Result<Role, IamError> {
        let trust = trust_policy_document(trust_principal);

        let mut role = match self.client.create_role(role_name, &trust, &self.description).await {
            Ok(role) => {
                info!(role = %role_name, arn = %role.arn, "Created role");
                role
            }
            Err(IamError::EntityAlreadyExists(_)) => {
                warn!(role = %role_name, "Role already exists, re-using");
                self.client.get_role(role_name).await?
            }
            Err(e) => return Err(e),
        };

        let document = invoke_model_policy_document(allowed_model_arn);
        self.client.put_role_policy(role_name, policy_name, &document).await?;
        info!(role = %role_name, policy = %policy_name, "Attached inline policy");

        role.inline_policies.retain(|p| p.name != policy_name);
        role.inline_policies.push(InlinePolicy {
            name: policy_name.to_string(),
            document,
        });
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_document_names_the_service_principal() {
        let doc: serde_json::Value = serde_json::from_str(&trust_policy_document("bedrock.amazonaws.com")).unwrap();
        assert_eq!(doc["Version"], "2012-10-17");
        let stmt = &doc["Statement"][0];
        assert_eq!(stmt["Effect"], "Allow");
        assert_eq!(stmt["Principal"]["Service"], "bedrock.amazonaws.com");
        assert_eq!(stmt["Action"], "sts:AssumeRole");
    }

    #[test]
    fn invoke_policy_is_scoped_to_one_model() {
        let arn = "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2";
        let doc: serde_json::Value = serde_json::from_str(&invoke_model_policy_document(arn)).unwrap();
        let statements = doc["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["Action"], "bedrock:InvokeModel");
        assert_eq!(statements[0]["Resource"], arn);
    }
}
