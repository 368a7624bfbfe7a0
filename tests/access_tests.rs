use bedrock_agent_runner::access::{invoke_model_policy_document, AccessProvisioner};
use bedrock_agent_runner::clients::mock::MockIdentity;
use bedrock_agent_runner::error::IamError;

const ROLE: &str = "AmazonBedrockExecutionRoleForAgents_Example";
const POLICY: &str = "AllowBedrockInvokeModelPolicy";
const PRINCIPAL: &str = "bedrock.amazonaws.com";
const MODEL_ARN: &str = "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2";

#[tokio::test]
async fn creates_role_and_attaches_policy() {
    let (client, handle) = MockIdentity::new();
    let provisioner = AccessProvisioner::new(client, "test role");

    let role = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap();

    assert_eq!(role.name, ROLE);
    assert!(role.arn.ends_with(&format!(":role/{ROLE}")));
    assert!(role.trust_policy.as_deref().unwrap().contains(PRINCIPAL));
    assert_eq!(role.inline_policies.len(), 1);
    assert_eq!(role.inline_policies[0].name, POLICY);
    assert_eq!(handle.create_calls(), 1);
    assert_eq!(handle.get_calls(), 0);
    assert_eq!(handle.put_calls(), 1);
    assert_eq!(handle.policy(ROLE, POLICY), Some(invoke_model_policy_document(MODEL_ARN)));
}

#[tokio::test]
async fn second_call_reuses_existing_role() {
    let (client, handle) = MockIdentity::new();
    let provisioner = AccessProvisioner::new(client, "test role");

    let first = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap();
    let second = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap();

    assert_eq!(first.arn, second.arn);
    // The second create attempt hits the conflict and falls back to a fetch.
    assert_eq!(handle.create_calls(), 2);
    assert_eq!(handle.get_calls(), 1);
    assert_eq!(handle.put_calls(), 2);
    assert_eq!(second.inline_policies.len(), 1);
}

#[tokio::test]
async fn role_from_an_earlier_run_is_repaired() {
    let (client, handle) = MockIdentity::new();
    handle.insert_role(ROLE, "arn:aws:iam::123456789012:role/existing");
    let provisioner = AccessProvisioner::new(client, "test role");

    let role = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap();

    assert_eq!(role.arn, "arn:aws:iam::123456789012:role/existing");
    assert_eq!(handle.get_calls(), 1);
    assert!(handle.policy(ROLE, POLICY).is_some());
}

#[tokio::test]
async fn other_create_failures_propagate_unchanged() {
    let (client, handle) = MockIdentity::new();
    handle.fail_create_with(IamError::Api("AccessDenied: not authorized to perform iam:CreateRole".into()));
    let provisioner = AccessProvisioner::new(client, "test role");

    let err = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap_err();

    assert_eq!(err, IamError::Api("AccessDenied: not authorized to perform iam:CreateRole".into()));
    assert_eq!(handle.get_calls(), 0);
    assert_eq!(handle.put_calls(), 0);
}

#[tokio::test]
async fn policy_failure_is_fatal_and_leaves_bare_role() {
    let (client, handle) = MockIdentity::new();
    handle.fail_put_policy_with(IamError::Api("MalformedPolicyDocument".into()));
    let provisioner = AccessProvisioner::new(client, "test role");

    let err = provisioner.ensure_role(ROLE, PRINCIPAL, POLICY, MODEL_ARN).await.unwrap_err();

    assert_eq!(err, IamError::Api("MalformedPolicyDocument".into()));
    assert!(handle.role_exists(ROLE));
    assert_eq!(handle.policy(ROLE, POLICY), None);
}
