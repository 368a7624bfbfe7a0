use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use bedrock_agent_runner::clients::mock::{MockAgentControl, MockIdentity, MockRuntime};
use bedrock_agent_runner::config::{attempts_limit, confirm};
use bedrock_agent_runner::core::{AgentControlClient, AgentRuntimeClient, AgentStatus, IdentityClient};
use bedrock_agent_runner::error::{ConfigError, WorkflowError};
use bedrock_agent_runner::interceptors::FileInterceptor;
use bedrock_agent_runner::{AgentWorkflow, WorkflowConfig, WorkflowReport};

#[derive(Clone, Debug, ValueEnum)]
enum Backend {
    /// Real AWS APIs (requires the `aws-sdk` feature)
    Aws,
    /// Scripted in-memory APIs, no network
    Mock,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Aws => write!(f, "aws"),
            Backend::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Provision, prepare and invoke a Bedrock agent", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES (also read from .env):
    AGENT_RUNNER_REGION              AWS region (falls back to AWS_REGION)
    AGENT_RUNNER_ROLE_NAME           Execution role name
    AGENT_RUNNER_TRUST_PRINCIPAL     Service principal allowed to assume the role
    AGENT_RUNNER_POLICY_NAME         Inline policy name
    AGENT_RUNNER_MODEL               Foundation model id
    AGENT_RUNNER_MODEL_ARN           Model ARN granted to the role
    AGENT_RUNNER_AGENT_NAME          Agent name
    AGENT_RUNNER_INSTRUCTION         Agent base instruction
    AGENT_RUNNER_SESSION_ID          Invocation session id
    AGENT_RUNNER_ALIAS_ID            Alias to invoke instead of the prepared version
    AGENT_RUNNER_QUESTION            Prompt sent to the agent
    AGENT_RUNNER_POLL_INTERVAL_SECS  Seconds between status reads
    AGENT_RUNNER_MAX_POLL_ATTEMPTS   Status reads before giving up (0 = never)
    RUST_LOG                         Log filter (default: info)

EXAMPLES:
    agent-runner --backend mock                       # Dry run against in-memory APIs
    agent-runner --yes \"What is the tallest building in Seattle?\"
    agent-runner --model meta.llama2-13b-chat-v1 --max-poll-attempts 0")]
struct Args {
    /// Question to ask the agent [default: sample question]
    question: Option<String>,

    /// Which API implementation to talk to
    #[arg(long, value_enum, default_value_t = Backend::Aws)]
    backend: Backend,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    role_name: Option<String>,

    /// Service principal allowed to assume the role
    #[arg(long)]
    trust_principal: Option<String>,

    #[arg(long)]
    policy_name: Option<String>,

    /// Foundation model id backing the agent
    #[arg(long)]
    model: Option<String>,

    /// Model ARN granted to the role [default: derived from region and model]
    #[arg(long)]
    model_arn: Option<String>,

    #[arg(long)]
    agent_name: Option<String>,

    #[arg(long)]
    instruction: Option<String>,

    #[arg(long)]
    session_id: Option<String>,

    /// Invoke this alias instead of the prepared version
    #[arg(long)]
    alias_id: Option<String>,

    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Status reads before giving up; 0 polls forever
    #[arg(long)]
    max_poll_attempts: Option<u32>,

    /// Save a markdown transcript of the invocation in this directory
    #[arg(long)]
    transcript_dir: Option<PathBuf>,

    /// Print the run report as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

impl Args {
    fn apply(&self, mut config: WorkflowConfig) -> WorkflowConfig {
        let overrides = [
            (&self.region, &mut config.region),
            (&self.role_name, &mut config.role_name),
            (&self.trust_principal, &mut config.trust_principal),
            (&self.policy_name, &mut config.policy_name),
            (&self.model, &mut config.foundation_model),
            (&self.agent_name, &mut config.agent_name),
            (&self.instruction, &mut config.instruction),
            (&self.session_id, &mut config.session_id),
            (&self.question, &mut config.question),
        ];
        for (arg, slot) in overrides {
            if let Some(value) = arg {
                *slot = value.clone();
            }
        }
        if self.model_arn.is_some() {
            config.model_arn = self.model_arn.clone();
        }
        if self.alias_id.is_some() {
            config.alias_id = self.alias_id.clone();
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll.interval = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_poll_attempts {
            config.poll.max_attempts = attempts_limit(max);
        }
        config
    }
}

fn aws_feature_disabled() -> ConfigError {
    ConfigError::FeatureDisabled(
        "The aws backend requires the optional `aws-sdk` feature. Rebuild with `--features aws-sdk` or use `--backend mock`.".to_string(),
    )
}

impl Backend {
    /// Fails for backends this build cannot talk to.
    fn ensure_available(&self) -> Result<(), ConfigError> {
        match self {
            Backend::Aws if !cfg!(feature = "aws-sdk") => Err(aws_feature_disabled()),
            _ => Ok(()),
        }
    }
}

async fn run<I, C, R>(
    config: WorkflowConfig,
    identity: I,
    control: C,
    runtime: R,
    transcript_dir: Option<PathBuf>,
) -> Result<WorkflowReport, WorkflowError>
where
    I: IdentityClient,
    C: AgentControlClient,
    R: AgentRuntimeClient,
{
    let mut workflow = AgentWorkflow::new(config, identity, control, runtime);
    if let Some(dir) = transcript_dir {
        workflow = workflow.with_interceptor(Box::new(FileInterceptor::new(dir)));
    }

    println!("Response stream from the agent:\n---------------------------------");
    let report = workflow
        .run_with(|text| {
            print!("{text}");
            let _ = io::stdout().flush();
        })
        .await?;
    println!("\n---------------------------------");
    Ok(report)
}

#[cfg(feature = "aws-sdk")]
async fn run_aws(config: WorkflowConfig, transcript_dir: Option<PathBuf>) -> Result<WorkflowReport, WorkflowError> {
    let (identity, control, runtime) = bedrock_agent_runner::clients::aws::connect(&config.region).await;
    run(config, identity, control, runtime, transcript_dir).await
}

#[cfg(not(feature = "aws-sdk"))]
async fn run_aws(_config: WorkflowConfig, _transcript_dir: Option<PathBuf>) -> Result<WorkflowReport, WorkflowError> {
    Err(aws_feature_disabled().into())
}

async fn run_mock(config: WorkflowConfig, transcript_dir: Option<PathBuf>) -> Result<WorkflowReport, WorkflowError> {
    let (identity, _) = MockIdentity::new();
    let (control, _) = MockAgentControl::with_statuses([
        AgentStatus::NotPrepared,
        AgentStatus::Preparing,
        AgentStatus::Prepared,
    ]);
    let (runtime, _) = MockRuntime::with_text_chunks([
        "This is a mock agent. ",
        "You asked: ",
        config.question.as_str(),
    ]);
    run(config, identity, control, runtime, transcript_dir).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args = Args::parse();
    let config = args.apply(WorkflowConfig::from_env().context("reading AGENT_RUNNER_* settings")?);
    config.validate()?;
    args.backend.ensure_available()?;

    if matches!(args.backend, Backend::Aws) && !args.yes {
        let summary = format!(
            "Create or update role '{}' and create agent '{}' ({}) in {}?",
            config.role_name, config.agent_name, config.foundation_model, config.region
        );
        if !confirm(&summary) {
            return Err(WorkflowError::Aborted.into());
        }
    }

    println!("Backend: {}", args.backend);
    let report = match args.backend {
        Backend::Aws => run_aws(config, args.transcript_dir.clone()).await,
        Backend::Mock => {
            // Mock paths skip polling waits.
            let mut config = config;
            config.poll.interval = Duration::ZERO;
            run_mock(config, args.transcript_dir.clone()).await
        }
    }?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("Using agent role ARN: {}", report.role.arn);
    println!("Agent: {} (version {}, alias {})", report.agent.id, report.prepared.version, report.alias_id);
    println!("\nFinal Combined Output:\n{}", report.response);
    Ok(())
}
