use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::InvocationSession;

/// Observes a completed invocation.
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    async fn save(&self, session: &InvocationSession, response: &str) -> std::io::Result<()>;
}

pub mod file;
pub use file::FileInterceptor;
