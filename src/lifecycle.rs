//! Agent lifecycle: create a draft agent, then prepare it and poll its status
//! until it is ready to invoke.

use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::core::{Agent, AgentControlClient, AgentStatus, CreateAgentRequest, PreparedAgent};
use crate::error::AgentError;

/// How the wait between status reads grows.
///
/// An exponential factor below 1.0 (or NaN) never shrinks the wait; it
/// behaves as `Fixed`.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential { factor: f64, max_interval: Duration },
}

impl Backoff {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Fixed => true,
            Self::Exponential { factor, .. } => factor.is_finite() && *factor >= 1.0,
        }
    }
}

/// Polling policy for `prepare_agent`.
///
/// `max_attempts: None` polls until the agent reaches a terminal status,
/// however long that takes.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: Some(120),
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            backoff: Backoff::Fixed,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before status read number `attempt + 1` (attempts count from 1).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { factor, .. } if factor.is_nan() || *factor < 1.0 => self.interval,
            Backoff::Exponential { factor, max_interval } => {
                let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.interval.as_secs_f64() * factor.powi(exp);
                if !secs.is_finite() || secs >= max_interval.as_secs_f64() {
                    *max_interval
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentLifecycle<C: AgentControlClient> {
    client: C,
    policy: PollPolicy,
}

impl<C: AgentControlClient> AgentLifecycle<C> {
    pub fn new(client: C, policy: PollPolicy) -> Self {
        info!(interval = ?policy.interval, max_attempts = ?policy.max_attempts, "Creating agent lifecycle manager");
        Self { client, policy }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a draft agent. Remote rejections surface unchanged.
    #[instrument(target = "bedrock_agent_runner::lifecycle", skip(self, instruction), fields(instruction_len = instruction.len()))]
    pub async fn create_agent(
        &self,
        name: &str,
        model_id: &str,
        instruction: &str,
        role_arn: &str,
    ) -> Result<Agent, AgentError> {
        info!(agent = %name, model = %model_id, "Creating agent");
        let request = CreateAgentRequest {
            name: name.to_string(),
            model_id: model_id.to_string(),
            instruction: instruction.to_string(),
            role_arn: role_arn.to_string(),
        };
        let agent = self.client.create_agent(&request).await?;
        info!(agent_id = %agent.id, status = %agent.status, "Agent creation initiated");
        Ok(agent)
    }

    /// Issue one prepare command, then read the status until it is
    /// `PREPARED`. `FAILED` and `DELETED` abort immediately; every other
    /// status is re-polled after the policy's delay.
    #[instrument(target = "bedrock_agent_runner::lifecycle", skip(self))]
    pub async fn prepare_agent(&self, agent_id: &str) -> Result<PreparedAgent, AgentError> {
        info!(agent_id = %agent_id, "Preparing agent");
        let version = self.client.prepare_agent(agent_id).await?;

        let mut attempts: u32 = 0;
        loop {
            let agent = self.client.get_agent(agent_id).await?;
            attempts += 1;
            let status = agent.status;
            debug!(agent_id = %agent_id, attempt = attempts, status = %status, "Current agent status");

            if status == AgentStatus::Prepared {
                info!(agent_id = %agent_id, version = %version, status_reads = attempts, "Agent is prepared");
                return Ok(PreparedAgent {
                    agent_id: agent_id.to_string(),
                    version,
                    status,
                    status_reads: attempts,
                });
            }
            if status.is_terminal_failure() {
                return Err(AgentError::UnexpectedStatus {
                    agent_id: agent_id.to_string(),
                    status,
                });
            }
            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(AgentError::PollTimeout {
                    agent_id: agent_id.to_string(),
                    attempts,
                    last_status: status,
                });
            }

            tokio::time::sleep(self.policy.delay_after(attempts)).await;
        }
    }
}
