//! Streaming invocation of a prepared agent.

use futures_util::StreamExt;
use tracing::{debug, info, instrument, trace};

use crate::core::{AgentRuntimeClient, InvocationSession, StreamFragment};
use crate::error::RuntimeError;

#[derive(Debug, Clone)]
pub struct InvocationClient<C: AgentRuntimeClient> {
    client: C,
}

impl<C: AgentRuntimeClient> InvocationClient<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Invoke the agent and return the concatenated answer text.
    pub async fn invoke(
        &self,
        agent_id: &str,
        alias_id: &str,
        session_id: &str,
        input_text: &str,
    ) -> Result<String, RuntimeError> {
        self.invoke_with(agent_id, alias_id, session_id, input_text, |_| {}).await
    }

    /// Like `invoke`, but hands each decoded text fragment to `on_text` as it
    /// arrives. Trace fragments are dropped. The first transport or decode
    /// error aborts the call and nothing partial is returned.
    #[instrument(target = "bedrock_agent_runner::invocation", skip(self, input_text, on_text), fields(input_len = input_text.len()))]
    pub async fn invoke_with<F>(
        &self,
        agent_id: &str,
        alias_id: &str,
        session_id: &str,
        input_text: &str,
        mut on_text: F,
    ) -> Result<String, RuntimeError>
    where
        F: FnMut(&str) + Send,
    {
        let session = InvocationSession {
            agent_id: agent_id.to_string(),
            alias_id: alias_id.to_string(),
            session_id: session_id.to_string(),
            input_text: input_text.to_string(),
        };
        info!(agent_id = %agent_id, alias_id = %alias_id, session_id = %session_id, "Invoking agent");

        let mut stream = self.client.invoke_agent(&session).await?;
        let mut response = String::new();
        let mut text_fragments = 0usize;
        let mut trace_fragments = 0usize;

        while let Some(fragment) = stream.next().await {
            match fragment? {
                StreamFragment::Text(bytes) => {
                    let text = std::str::from_utf8(&bytes)?;
                    text_fragments += 1;
                    debug!(len = text.len(), "Text fragment");
                    on_text(text);
                    response.push_str(text);
                }
                StreamFragment::Trace(record) => {
                    trace_fragments += 1;
                    trace!(record = %record, "Skipping trace fragment");
                }
            }
        }

        info!(text_fragments, trace_fragments, response_len = response.len(), "Agent response complete");
        Ok(response)
    }
}
