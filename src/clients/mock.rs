//! Scripted in-memory stand-ins for the three remote APIs.
//!
//! Each mock comes with an `Arc` handle that scripts responses and records
//! calls, so tests can assert on exactly which remote operations ran.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::{
    Agent, AgentControlClient, AgentRuntimeClient, AgentStatus, CreateAgentRequest, FragmentStream,
    IdentityClient, InvocationSession, Role, StreamFragment,
};
use crate::error::{AgentError, IamError, RuntimeError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct IdentityState {
    roles: HashMap<String, Role>,
    policies: HashMap<(String, String), String>,
    create_calls: usize,
    get_calls: usize,
    put_calls: usize,
    create_error: Option<IamError>,
    put_error: Option<IamError>,
}

/// Handle for scripting and inspecting a `MockIdentity`.
#[derive(Debug, Default)]
pub struct MockIdentityHandle {
    state: Mutex<IdentityState>,
}

impl MockIdentityHandle {
    /// Seed a role as if it had been created in an earlier run.
    pub fn insert_role(&self, name: &str, arn: &str) {
        lock(&self.state).roles.insert(
            name.to_string(),
            Role {
                name: name.to_string(),
                arn: arn.to_string(),
                trust_policy: None,
                inline_policies: Vec::new(),
            },
        );
    }

    /// Make every `create_role` fail with `err` (the conflict path still wins
    /// for names that already exist).
    pub fn fail_create_with(&self, err: IamError) {
        lock(&self.state).create_error = Some(err);
    }

    pub fn fail_put_policy_with(&self, err: IamError) {
        lock(&self.state).put_error = Some(err);
    }

    pub fn create_calls(&self) -> usize {
        lock(&self.state).create_calls
    }

    pub fn get_calls(&self) -> usize {
        lock(&self.state).get_calls
    }

    pub fn put_calls(&self) -> usize {
        lock(&self.state).put_calls
    }

    pub fn role_exists(&self, name: &str) -> bool {
        lock(&self.state).roles.contains_key(name)
    }

    pub fn policy(&self, role_name: &str, policy_name: &str) -> Option<String> {
        lock(&self.state)
            .policies
            .get(&(role_name.to_string(), policy_name.to_string()))
            .cloned()
    }
}

#[derive(Debug, Clone)]
pub struct MockIdentity {
    handle: Arc<MockIdentityHandle>,
    account_id: String,
}

impl MockIdentity {
    pub fn new() -> (Self, Arc<MockIdentityHandle>) {
        let handle = Arc::new(MockIdentityHandle::default());
        let client = Self {
            handle: handle.clone(),
            account_id: "123456789012".to_string(),
        };
        (client, handle)
    }
}

#[async_trait]
impl IdentityClient for MockIdentity {
    async fn create_role(&self, name: &str, trust_document: &str, _description: &str) -> Result<Role, IamError> {
        let mut state = lock(&self.handle.state);
        state.create_calls += 1;
        if state.roles.contains_key(name) {
            return Err(IamError::EntityAlreadyExists(name.to_string()));
        }
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        let role = Role {
            name: name.to_string(),
            arn: format!("arn:aws:iam::{}:role/{}", self.account_id, name),
            trust_policy: Some(trust_document.to_string()),
            inline_policies: Vec::new(),
        };
        state.roles.insert(name.to_string(), role.clone());
        Ok(role)
    }

    async fn get_role(&self, name: &str) -> Result<Role, IamError> {
        let mut state = lock(&self.handle.state);
        state.get_calls += 1;
        state
            .roles
            .get(name)
            .cloned()
            .ok_or_else(|| IamError::Api(format!("NoSuchEntity: role {name} not found")))
    }

    async fn put_role_policy(&self, role_name: &str, policy_name: &str, document: &str) -> Result<(), IamError> {
        let mut state = lock(&self.handle.state);
        state.put_calls += 1;
        if let Some(err) = state.put_error.clone() {
            return Err(err);
        }
        if !state.roles.contains_key(role_name) {
            return Err(IamError::Api(format!("NoSuchEntity: role {role_name} not found")));
        }
        state
            .policies
            .insert((role_name.to_string(), policy_name.to_string()), document.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct AgentControlState {
    agents: HashMap<String, Agent>,
    statuses: VecDeque<AgentStatus>,
    version: String,
    create_error: Option<AgentError>,
    created: Vec<CreateAgentRequest>,
    create_calls: usize,
    get_calls: usize,
    prepare_calls: usize,
}

/// Handle for scripting and inspecting a `MockAgentControl`.
#[derive(Debug, Default)]
pub struct MockAgentControlHandle {
    state: Mutex<AgentControlState>,
}

impl MockAgentControlHandle {
    /// Statuses returned by successive `get_agent` calls. The last one repeats
    /// once the script runs out.
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = AgentStatus>) {
        lock(&self.state).statuses = statuses.into_iter().collect();
    }

    pub fn set_prepared_version(&self, version: &str) {
        lock(&self.state).version = version.to_string();
    }

    pub fn fail_create_with(&self, err: AgentError) {
        lock(&self.state).create_error = Some(err);
    }

    pub fn create_calls(&self) -> usize {
        lock(&self.state).create_calls
    }

    pub fn get_calls(&self) -> usize {
        lock(&self.state).get_calls
    }

    pub fn prepare_calls(&self) -> usize {
        lock(&self.state).prepare_calls
    }

    pub fn created_requests(&self) -> Vec<CreateAgentRequest> {
        lock(&self.state).created.clone()
    }
}

#[derive(Debug, Clone)]
pub struct MockAgentControl {
    handle: Arc<MockAgentControlHandle>,
}

impl MockAgentControl {
    pub fn new() -> (Self, Arc<MockAgentControlHandle>) {
        Self::with_statuses([AgentStatus::Prepared])
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = AgentStatus>) -> (Self, Arc<MockAgentControlHandle>) {
        let handle = Arc::new(MockAgentControlHandle::default());
        handle.script_statuses(statuses);
        handle.set_prepared_version("DRAFT");
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl AgentControlClient for MockAgentControl {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent, AgentError> {
        let mut state = lock(&self.handle.state);
        state.create_calls += 1;
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        let agent = Agent {
            id: format!("AGENT{:05}", state.agents.len() + 1),
            name: request.name.clone(),
            model_id: request.model_id.clone(),
            instruction: request.instruction.clone(),
            role_arn: request.role_arn.clone(),
            status: AgentStatus::Creating,
            version: None,
        };
        state.agents.insert(agent.id.clone(), agent.clone());
        state.created.push(request.clone());
        Ok(agent)
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Agent, AgentError> {
        let mut state = lock(&self.handle.state);
        state.get_calls += 1;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        let version = state.version.clone();
        let agent = state
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentError::Api(format!("ResourceNotFoundException: agent {agent_id} not found")))?;
        if let Some(status) = status {
            if status == AgentStatus::Prepared {
                agent.version = Some(version);
            }
            agent.status = status;
        }
        Ok(agent.clone())
    }

    async fn prepare_agent(&self, agent_id: &str) -> Result<String, AgentError> {
        let mut state = lock(&self.handle.state);
        state.prepare_calls += 1;
        if !state.agents.contains_key(agent_id) {
            return Err(AgentError::Api(format!("ResourceNotFoundException: agent {agent_id} not found")));
        }
        Ok(state.version.clone())
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    fragments: Vec<Result<StreamFragment, RuntimeError>>,
    open_error: Option<RuntimeError>,
    sessions: Vec<InvocationSession>,
}

/// Handle for scripting and inspecting a `MockRuntime`.
#[derive(Debug, Default)]
pub struct MockRuntimeHandle {
    state: Mutex<RuntimeState>,
}

impl MockRuntimeHandle {
    /// Fragments yielded, in order, by every invocation.
    pub fn script_fragments(&self, fragments: impl IntoIterator<Item = Result<StreamFragment, RuntimeError>>) {
        lock(&self.state).fragments = fragments.into_iter().collect();
    }

    pub fn fail_open_with(&self, err: RuntimeError) {
        lock(&self.state).open_error = Some(err);
    }

    pub fn invocations(&self) -> Vec<InvocationSession> {
        lock(&self.state).sessions.clone()
    }

    pub fn invoke_calls(&self) -> usize {
        lock(&self.state).sessions.len()
    }
}

#[derive(Debug, Clone)]
pub struct MockRuntime {
    handle: Arc<MockRuntimeHandle>,
}

impl MockRuntime {
    pub fn new() -> (Self, Arc<MockRuntimeHandle>) {
        let handle = Arc::new(MockRuntimeHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    /// A runtime that answers every invocation with `chunks`, separated by a
    /// trace record.
    pub fn with_text_chunks<I, S>(chunks: I) -> (Self, Arc<MockRuntimeHandle>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (client, handle) = Self::new();
        let mut fragments = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                fragments.push(Ok(StreamFragment::Trace(format!("orchestration step {i}"))));
            }
            fragments.push(Ok(StreamFragment::text(chunk)));
        }
        handle.script_fragments(fragments);
        (client, handle)
    }
}

#[async_trait]
impl AgentRuntimeClient for MockRuntime {
    async fn invoke_agent(&self, session: &InvocationSession) -> Result<FragmentStream, RuntimeError> {
        let fragments = {
            let mut state = lock(&self.handle.state);
            state.sessions.push(session.clone());
            if let Some(err) = state.open_error.clone() {
                return Err(err);
            }
            state.fragments.clone()
        };
        Ok(Box::pin(async_stream::stream! {
            for fragment in fragments {
                yield fragment;
            }
        }))
    }
}
