use std::env;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    terminal,
};

use crate::error::ConfigError;
use crate::lifecycle::PollPolicy;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ROLE_NAME: &str = "AmazonBedrockExecutionRoleForAgents_Example";
pub const DEFAULT_ROLE_DESCRIPTION: &str = "IAM role for Bedrock Agent to invoke foundation models.";
pub const DEFAULT_TRUST_PRINCIPAL: &str = "bedrock.amazonaws.com";
pub const DEFAULT_POLICY_NAME: &str = "AllowBedrockInvokeModelPolicy";
pub const DEFAULT_FOUNDATION_MODEL: &str = "anthropic.claude-v2";
pub const DEFAULT_AGENT_NAME: &str = "my-bedrock-agent-demo";
pub const DEFAULT_INSTRUCTION: &str = "You are a helpful agent that answers questions about general knowledge.\n\
If the user asks something outside your context, politely say you cannot answer.";
pub const DEFAULT_SESSION_ID: &str = "my-session-001";
pub const DEFAULT_QUESTION: &str = "Hi agent, can you tell me a bit about the city of Seattle?";

/// Lookup of prefixed settings from the process environment, after loading a
/// `.env` file if one is present.
pub trait FromEnv {
    /// Prefix shared by every variable this type reads.
    const PREFIX: &'static str;

    fn env_var(name: &str) -> Option<String> {
        let _ = dotenvy::dotenv();
        env::var(format!("{}{}", Self::PREFIX, name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

/// Everything one provisioning run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub region: String,
    pub role_name: String,
    pub role_description: String,
    pub trust_principal: String,
    pub policy_name: String,
    pub foundation_model: String,
    /// Overrides the ARN derived from region and model.
    pub model_arn: Option<String>,
    pub agent_name: String,
    pub instruction: String,
    pub session_id: String,
    /// Invoke through this alias instead of the prepared version.
    pub alias_id: Option<String>,
    pub question: String,
    pub poll: PollPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            role_name: DEFAULT_ROLE_NAME.to_string(),
            role_description: DEFAULT_ROLE_DESCRIPTION.to_string(),
            trust_principal: DEFAULT_TRUST_PRINCIPAL.to_string(),
            policy_name: DEFAULT_POLICY_NAME.to_string(),
            foundation_model: DEFAULT_FOUNDATION_MODEL.to_string(),
            model_arn: None,
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            alias_id: None,
            question: DEFAULT_QUESTION.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl FromEnv for WorkflowConfig {
    const PREFIX: &'static str = "AGENT_RUNNER_";
}

impl WorkflowConfig {
    /// Defaults overlaid with `AGENT_RUNNER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| {
            Self::env_var(key).or_else(|| match key {
                "REGION" => env::var("AWS_REGION").ok().filter(|v| !v.is_empty()),
                _ => None,
            })
        })
    }

    /// Overlay values produced by `lookup` (keyed by the unprefixed variable
    /// name, e.g. `REGION`) onto this config.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("REGION") {
            self.region = region;
        }
        let strings: [(&str, &mut String); 8] = [
            ("ROLE_NAME", &mut self.role_name),
            ("TRUST_PRINCIPAL", &mut self.trust_principal),
            ("POLICY_NAME", &mut self.policy_name),
            ("MODEL", &mut self.foundation_model),
            ("AGENT_NAME", &mut self.agent_name),
            ("INSTRUCTION", &mut self.instruction),
            ("SESSION_ID", &mut self.session_id),
            ("QUESTION", &mut self.question),
        ];
        for (key, slot) in strings {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if let Some(arn) = lookup("MODEL_ARN") {
            self.model_arn = Some(arn);
        }
        if let Some(alias) = lookup("ALIAS_ID") {
            self.alias_id = Some(alias);
        }
        if let Some(secs) = lookup("POLL_INTERVAL_SECS") {
            self.poll.interval = Duration::from_secs(parse_number("POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(max) = lookup("MAX_POLL_ATTEMPTS") {
            self.poll.max_attempts = attempts_limit(parse_number("MAX_POLL_ATTEMPTS", &max)?);
        }
        Ok(self)
    }

    /// ARN of the single model the execution role may invoke.
    pub fn model_arn(&self) -> String {
        self.model_arn
            .clone()
            .unwrap_or_else(|| format!("arn:aws:bedrock:{}::foundation-model/{}", self.region, self.foundation_model))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("region", &self.region),
            ("role_name", &self.role_name),
            ("trust_principal", &self.trust_principal),
            ("policy_name", &self.policy_name),
            ("foundation_model", &self.foundation_model),
            ("agent_name", &self.agent_name),
            ("instruction", &self.instruction),
            ("session_id", &self.session_id),
            ("question", &self.question),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        if self.alias_id.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ConfigError::Missing("alias_id"));
        }
        if self.poll.max_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_poll_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.poll.backoff.is_valid() {
            return Err(ConfigError::Invalid {
                field: "backoff",
                message: "exponential factor must be a finite number of at least 1.0".to_string(),
            });
        }
        Ok(())
    }
}

/// `0` means "no limit".
pub fn attempts_limit(max: u32) -> Option<u32> {
    (max > 0).then_some(max)
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        field,
        message: format!("{raw:?}: {e}"),
    })
}

/// Ask before touching remote state. Single keystroke when the terminal allows
/// it, otherwise a line read. Anything but `y` declines.
pub fn confirm(prompt: &str) -> bool {
    print!("{prompt} (y/N): ");
    let _ = io::stdout().flush();

    if let Ok(response) = read_single_key() {
        println!("{response}");
        return response == "y";
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        input.trim().eq_ignore_ascii_case("y")
    } else {
        false
    }
}

fn read_single_key() -> io::Result<&'static str> {
    terminal::enable_raw_mode()?;

    let result = (|| -> io::Result<&'static str> {
        if event::poll(Duration::from_secs(30))? {
            if let Event::Key(KeyEvent { code: KeyCode::Char('y' | 'Y'), .. }) = event::read()? {
                return Ok("y");
            }
        }
        Ok("n")
    })();

    terminal::disable_raw_mode()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Backoff;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_mirror_the_reference_run() {
        let config = WorkflowConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.foundation_model, "anthropic.claude-v2");
        assert_eq!(
            config.model_arn(),
            "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2"
        );
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_fields() {
        let config = WorkflowConfig::default()
            .with_overrides(lookup_from(&[
                ("REGION", "eu-west-1"),
                ("MODEL", "meta.llama2-13b-chat-v1"),
                ("ALIAS_ID", "TSTALIASID"),
                ("POLL_INTERVAL_SECS", "2"),
                ("MAX_POLL_ATTEMPTS", "0"),
            ]))
            .unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(
            config.model_arn(),
            "arn:aws:bedrock:eu-west-1::foundation-model/meta.llama2-13b-chat-v1"
        );
        assert_eq!(config.alias_id.as_deref(), Some("TSTALIASID"));
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, None);
    }

    #[test]
    fn explicit_model_arn_wins() {
        let config = WorkflowConfig::default()
            .with_overrides(lookup_from(&[("MODEL_ARN", "arn:custom")]))
            .unwrap();
        assert_eq!(config.model_arn(), "arn:custom");
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        let err = WorkflowConfig::default()
            .with_overrides(lookup_from(&[("POLL_INTERVAL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "POLL_INTERVAL_SECS", .. }));
    }

    #[test]
    fn empty_identifiers_fail_validation() {
        let config = WorkflowConfig {
            role_name: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Missing("role_name")));

        let config = WorkflowConfig {
            alias_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Missing("alias_id")));
    }

    #[test]
    fn negative_backoff_factor_fails_validation() {
        let config = WorkflowConfig {
            poll: PollPolicy::default().with_backoff(Backoff::Exponential {
                factor: -2.0,
                max_interval: Duration::from_secs(60),
            }),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "backoff", .. })));
    }
}
