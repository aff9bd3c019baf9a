//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use promethium::config::{API_KEY_ENV, BASE_URL_ENV};
use promethium::{
    ClientConfig, ConfigError, LogPolicy, PromethiumClient, PromethiumError, WaitOptions, Workflow,
    WorkflowId, WorkflowRequest, WorkflowStatus,
};

use crate::cli::WaitArgs;

/// Resolve configuration and build a client.
pub fn build_client(api_key: Option<&str>, base_url: Option<&str>) -> Result<PromethiumClient> {
    let config = ClientConfig::builder()
        .api_key(api_key)
        .base_url(base_url)
        .resolve()?;
    Ok(PromethiumClient::new(config)?)
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load a JSON workflow definition.
pub fn load_request(path: &Path) -> Result<WorkflowRequest> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    WorkflowRequest::from_json(&source)
        .with_context(|| format!("Invalid workflow definition: {}", path.display()))
}

impl WaitArgs {
    /// Polling options for the wait engine.
    pub fn options(&self) -> WaitOptions {
        WaitOptions::default()
            .with_interval(Duration::from_secs(self.interval))
            .with_timeout(self.timeout)
            .with_log(LogPolicy::StateChanges)
    }
}

/// Wait for a workflow behind a spinner.
pub async fn wait_for(
    client: &PromethiumClient,
    id: &WorkflowId,
    args: &WaitArgs,
) -> Result<Workflow> {
    eprintln!(
        "{} Waiting for workflow {} (timeout: {}s)",
        style("→").cyan().bold(),
        style(id).dim(),
        args.timeout.as_secs()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Waiting for workflow to finish...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = client.workflows().wait(id, &args.options()).await;
    spinner.finish_and_clear();
    let workflow = outcome?;

    let status = match workflow.status {
        WorkflowStatus::Completed | WorkflowStatus::Succeeded => style(&workflow.status).green(),
        _ => style(&workflow.status).red(),
    };
    eprintln!(
        "{} Workflow {} finished with status: {}",
        style("✓").green().bold(),
        style(id).dim(),
        status
    );
    Ok(workflow)
}

/// Write a results archive as `<dir>/<id>-results.zip`.
pub fn write_results_zip(dir: &Path, id: &WorkflowId, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(format!("{id}-results.zip"));
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// The configuration error behind `err`, if any.
pub fn config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.chain().find_map(|cause| {
        cause.downcast_ref::<ConfigError>().or_else(|| {
            match cause.downcast_ref::<PromethiumError>() {
                Some(PromethiumError::Configuration(inner)) => Some(inner),
                _ => None,
            }
        })
    })
}

/// Ordered remediation steps for a missing setting.
pub fn remediation(err: &ConfigError) -> Option<String> {
    let (what, flag, short, env, command) = match err {
        ConfigError::MissingApiKey => (
            "API key",
            "--api-key",
            "-k",
            API_KEY_ENV,
            "credentials <API_KEY>",
        ),
        ConfigError::MissingBaseUrl => ("base URL", "--base-url", "-b", BASE_URL_ENV, "base-url <URL>"),
        _ => return None,
    };
    Some(format!(
        "Promethium {what} not found. {what}s are set in the following order of precedence:\n    \
         1. Run this script with the `{flag}` or `{short}` option.\n    \
         2. Set the `{env}` environment variable.\n    \
         3. Run `promethium config {command}` to store it in ~/.promethium.ini."
    ))
}
