//! Promethium API client
//!
//! Submit computational-chemistry workflows to a Promethium service, wait for
//! them to finish, and fetch their results. All computation happens remotely;
//! this crate models the jobs, polls them, and decodes what comes back.
//!
//! # Overview
//!
//! - [`PromethiumClient`] owns one pooled HTTP connection and exposes the
//!   [`Workflows`] and [`Files`] resource clients.
//! - [`wait_for_workflows`] polls a set of workflows until each reaches a
//!   terminal status, or fails with [`PromethiumError::Timeout`].
//! - [`Paginator`] walks list endpoints one page at a time or collects them.
//! - [`codec`] encodes molecule inputs and decodes result artifacts.
//!
//! # Configuration
//!
//! | Setting | Argument | Environment | `~/.promethium.ini` |
//! |---------|----------|-------------|---------------------|
//! | API key | `api_key` | `PM_API_KEY` | `[Credentials] api_key` |
//! | Base URL | `base_url` | `PM_BASE_URL` | `[Connection] base_url` |
//!
//! # Example
//!
//! ```ignore
//! use promethium::{
//!     MoleculeInput, PromethiumClient, SingleMoleculeParameters, WaitOptions,
//!     WorkflowParameters, WorkflowRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PromethiumClient::from_env()?;
//!
//!     let xyz = std::fs::read_to_string("benzaldehyde.xyz")?;
//!     let request = WorkflowRequest::new(
//!         "benzaldehyde-spc",
//!         WorkflowParameters::SinglePointCalculation(SingleMoleculeParameters {
//!             molecule: MoleculeInput::from_text(xyz, "xyz"),
//!             settings: Default::default(),
//!         }),
//!     );
//!
//!     let workflow = client.workflows().submit(&request).await?;
//!     let finished = client.workflows().wait(&workflow.id, &WaitOptions::default()).await?;
//!     println!("{} finished as {}", finished.id, finished.status);
//!
//!     let results = client.workflows().results(&workflow.id).await?;
//!     for name in results.artifact_names() {
//!         println!("{name}:\n{}", results.decode_artifact(&name)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod models;
pub mod page;
pub mod wait;
pub mod workflows;

pub use client::PromethiumClient;
pub use codec::{Artifact, Charset, Decoded, decode, decode_artifact, encode};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{ConfigError, PromethiumError, PromethiumResult};
pub use files::Files;
pub use models::*;
pub use page::{Page, PageSource, Paginator};
pub use wait::{
    LogPolicy, RetryPolicy, StatusLog, StatusSource, TracingStatusLog, WaitOptions,
    wait_for_workflows,
};
pub use workflows::Workflows;
