use super::Interceptor;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::InvocationSession;

/// Writes one markdown transcript per invocation under `base_path`.
#[derive(Debug)]
pub struct FileInterceptor {
    base_path: PathBuf,
}

impl FileInterceptor {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

fn file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn render_transcript(session: &InvocationSession, response: &str) -> String {
    format!(
        "# Session\n\n- agent: {}\n- alias: {}\n- session: {}\n\n# Prompt\n\n{}\n\n# Response\n\n{}\n",
        session.agent_id, session.alias_id, session.session_id, session.input_text, response
    )
}

#[async_trait]
impl Interceptor for FileInterceptor {
    async fn save(&self, session: &InvocationSession, response: &str) -> std::io::Result<()> {
        let timestamp = Utc::now();
        let filename = format!(
            "{}_{}.md",
            file_stem(&session.session_id),
            timestamp.format("%Y%m%d_%H%M%S_%3f")
        );
        let file_path = self.base_path.join(filename);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(render_transcript(session, response).as_bytes()).await?;
        file.flush().await?;
        debug!(path = %file_path.display(), "Saved transcript");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> InvocationSession {
        InvocationSession {
            agent_id: "AGENT00001".to_string(),
            alias_id: "DRAFT".to_string(),
            session_id: "my/session 001".to_string(),
            input_text: "Tell me about Seattle".to_string(),
        }
    }

    #[test]
    fn session_id_is_made_path_safe() {
        assert_eq!(file_stem("my/session 001"), "my_session_001");
        assert_eq!(file_stem("my-session_001"), "my-session_001");
    }

    #[tokio::test]
    async fn writes_prompt_and_response() {
        let dir = std::env::temp_dir().join(format!("agent-runner-transcripts-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let interceptor = FileInterceptor::new(dir.clone());
        interceptor.save(&session(), "Seattle is a city.").await.unwrap();

        let mut entries = std::fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("my_session_001_"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Prompt\n\nTell me about Seattle"));
        assert!(content.contains("# Response\n\nSeattle is a city."));
        assert!(content.contains("- alias: DRAFT"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
