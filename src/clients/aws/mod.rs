//! AWS SDK adapters for the collaborator traits.
//!
//! Credentials come from the SDK's default chain (environment, shared
//! config files, instance/container roles). Only the region is set here.

pub mod agent;
pub mod iam;
pub mod runtime;

pub use agent::AwsAgentControl;
pub use iam::AwsIdentity;
pub use runtime::AwsAgentRuntime;

use aws_smithy_types::error::display::DisplayErrorContext;

/// Load the shared SDK configuration bound to `region`.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

/// All three adapters built from one shared configuration.
pub async fn connect(region: &str) -> (AwsIdentity, AwsAgentControl, AwsAgentRuntime) {
    let config = load_sdk_config(region).await;
    (
        AwsIdentity::new(&config),
        AwsAgentControl::new(&config),
        AwsAgentRuntime::new(&config),
    )
}

/// Render an SDK error with its full source chain.
pub(crate) fn describe<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}
