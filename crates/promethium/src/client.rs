//! Top-level client facade.

use crate::config::ClientConfig;
use crate::error::PromethiumResult;
use crate::files::Files;
use crate::http::Connection;
use crate::workflows::Workflows;

/// Entry point composing one shared connection with both resource clients.
#[derive(Debug, Clone)]
pub struct PromethiumClient {
    conn: Connection,
    workflows: Workflows,
    files: Files,
}

impl PromethiumClient {
    /// Build a client from resolved configuration.
    pub fn new(config: ClientConfig) -> PromethiumResult<Self> {
        let conn = Connection::new(&config)?;
        Ok(Self {
            workflows: Workflows::new(conn.clone(), config.vocabulary().clone()),
            files: Files::new(conn.clone()),
            conn,
        })
    }

    /// Resolve configuration from `PM_API_KEY`/`PM_BASE_URL` and
    /// `~/.promethium.ini`, then build a client.
    pub fn from_env() -> PromethiumResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        self.conn.base_url()
    }

    pub fn workflows(&self) -> &Workflows {
        &self.workflows
    }

    pub fn files(&self) -> &Files {
        &self.files
    }
}
