use async_trait::async_trait;
use aws_sdk_bedrockagentruntime as agentruntime;
use agentruntime::types::ResponseStream;
use bytes::Bytes;
use tracing::{debug, instrument};

use super::describe;
use crate::core::{AgentRuntimeClient, FragmentStream, InvocationSession, StreamFragment};
use crate::error::RuntimeError;

#[derive(Clone, Debug)]
pub struct AwsAgentRuntime {
    client: agentruntime::Client,
}

impl AwsAgentRuntime {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: agentruntime::Client::new(config),
        }
    }

    pub fn from_client(client: agentruntime::Client) -> Self {
        Self { client }
    }
}

/// Chunks carry answer bytes; every other event kind is diagnostic.
fn fragment_from_event(event: ResponseStream) -> StreamFragment {
    match event {
        ResponseStream::Chunk(part) => {
            StreamFragment::Text(part.bytes.map(|b| Bytes::from(b.into_inner())).unwrap_or_default())
        }
        ResponseStream::Trace(trace) => StreamFragment::Trace(format!("{trace:?}")),
        other => StreamFragment::Trace(format!("{other:?}")),
    }
}

#[async_trait]
impl AgentRuntimeClient for AwsAgentRuntime {
    #[instrument(target = "bedrock_agent_runner::aws", skip(self, session), fields(agent_id = %session.agent_id, alias_id = %session.alias_id))]
    async fn invoke_agent(&self, session: &InvocationSession) -> Result<FragmentStream, RuntimeError> {
        debug!(session_id = %session.session_id, "InvokeAgent");
        let output = self
            .client
            .invoke_agent()
            .agent_id(&session.agent_id)
            .agent_alias_id(&session.alias_id)
            .session_id(&session.session_id)
            .input_text(&session.input_text)
            .send()
            .await
            .map_err(|err| RuntimeError::Api(describe(&err)))?;

        let mut completion = output.completion;
        let stream = async_stream::stream! {
            loop {
                match completion.recv().await {
                    Ok(Some(event)) => yield Ok(fragment_from_event(event)),
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(RuntimeError::Stream(describe(&err)));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
