//! Workflow lifecycle types.
//!
//! The server owns every status transition; the client only observes them:
//!
//! ```text
//!   submit() ──→ RUNNING ──→ COMPLETED | SUCCEEDED
//!                   │
//!                   ├──→ FAILED | TIMED_OUT
//!                   │
//!                   └──→ CANCELED | TERMINATED
//! ```
//!
//! **Invariants:**
//! - `submit()` returns a non-terminal status.
//! - Terminal statuses are permanent.
//! - `results()` is only defined once the workflow is terminal.
//!
//! Which labels count as terminal is configuration ([`StatusVocabulary`]), not
//! a property of [`WorkflowStatus`]: the service has shipped two terminal
//! vocabularies and may add more.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{labelled_enum, string_id};
use crate::codec::Artifact;
use crate::error::{PromethiumError, PromethiumResult};

/// Bytes per gigabyte, for reporting memory estimates.
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

string_id! {
    /// Server-assigned workflow identifier.
    WorkflowId
}

labelled_enum! {
    /// The type of calculation a workflow runs.
    WorkflowKind {
        TorsionScan => "TorsionScan",
        ConformerSearch => "ConformerSearch",
        SinglePointCalculation => "SinglePointCalculation",
        GeometryOptimization => "GeometryOptimization",
        InteractionEnergyCalculation => "InteractionEnergyCalculation",
        ReactionPathOptimization => "ReactionPathOptimization",
        TransitionStateOptimization => "TransitionStateOptimization",
        TransitionStateOptimizationFromEndpoints => "TransitionStateOptimizationFromEndpoints",
        FsaptCalculation => "FSAPTCalculation",
        FragmentedInteractionEnergy => "FragmentedInteractionEnergy",
        QuantumChemicalScoring => "QuantumChemicalScoring",
    }
}

labelled_enum! {
    /// Server-reported workflow status.
    WorkflowStatus {
        Running => "RUNNING",
        Completed => "COMPLETED",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
        Canceled => "CANCELED",
        Terminated => "TERMINATED",
        TimedOut => "TIMED_OUT",
    }
}

/// Partition of status labels into terminal and non-terminal sets.
///
/// Labels are compared case-insensitively. A label in neither set is
/// treated as non-terminal; [`StatusVocabulary::is_known`] lets callers
/// flag it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    terminal: BTreeSet<String>,
    non_terminal: BTreeSet<String>,
}

impl Default for StatusVocabulary {
    /// Union of both terminal vocabularies the service has used.
    fn default() -> Self {
        Self::new(
            ["COMPLETED", "SUCCEEDED", "FAILED", "CANCELED", "TERMINATED", "TIMED_OUT"],
            ["RUNNING"],
        )
    }
}

impl StatusVocabulary {
    /// Build a vocabulary from explicit label sets.
    pub fn new<T, N>(terminal: T, non_terminal: N) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            terminal: terminal
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
            non_terminal: non_terminal
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    /// Add a terminal label.
    pub fn with_terminal(mut self, label: impl AsRef<str>) -> Self {
        let label = label.as_ref().to_ascii_uppercase();
        self.non_terminal.remove(&label);
        self.terminal.insert(label);
        self
    }

    /// Whether the status is in the terminal set.
    pub fn is_terminal(&self, status: &WorkflowStatus) -> bool {
        self.terminal
            .contains(&status.as_str().to_ascii_uppercase())
    }

    /// Whether the status appears in either set.
    pub fn is_known(&self, status: &WorkflowStatus) -> bool {
        let label = status.as_str().to_ascii_uppercase();
        self.terminal.contains(&label) || self.non_terminal.contains(&label)
    }

    /// Terminal labels, sorted.
    pub fn terminal_labels(&self) -> impl Iterator<Item = &str> {
        self.terminal.iter().map(String::as_str)
    }
}

/// Snapshot of a submitted workflow, as returned by `GET /v0/workflows/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// The workflow identifier.
    pub id: WorkflowId,
    /// Human-readable name given at submission.
    #[serde(default)]
    pub name: String,
    /// Calculation type.
    pub kind: WorkflowKind,
    /// Status at the time of the snapshot.
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    /// Wall-clock duration reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Any other fields the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Numeric results of a finished workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub id: WorkflowId,
    pub kind: WorkflowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Status when the results were fetched.
    pub status: WorkflowStatus,
    /// Kind-specific result tree; may contain an `artifacts` mapping.
    #[serde(default)]
    pub results: Map<String, Value>,
}

impl WorkflowResult {
    /// Names of the artifacts embedded in the results.
    pub fn artifact_names(&self) -> Vec<String> {
        self.results
            .get("artifacts")
            .and_then(Value::as_object)
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every embedded artifact, keyed by name.
    pub fn artifacts(&self) -> PromethiumResult<BTreeMap<String, Artifact>> {
        match self.results.get("artifacts") {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    /// A single artifact by name.
    pub fn artifact(&self, name: &str) -> PromethiumResult<Artifact> {
        let value = self
            .results
            .get("artifacts")
            .and_then(|a| a.get(name))
            .ok_or_else(|| PromethiumError::ArtifactNotFound(name.to_string()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Decode a named artifact as text.
    pub fn decode_artifact(&self, name: &str) -> PromethiumResult<String> {
        crate::codec::decode_artifact(&self.artifact(name)?)
    }
}

/// GPU memory prediction returned by `POST /v0/workflows/memory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEstimate {
    /// Point prediction in bytes.
    pub prediction_bytes: f64,
    /// Quantile (e.g. `"0.025"`, `"0.975"`) to predicted bytes.
    #[serde(default)]
    pub percentile_prediction_bytes: BTreeMap<String, f64>,
}

impl MemoryEstimate {
    /// Point prediction in gigabytes.
    pub fn prediction_gb(&self) -> f64 {
        self.prediction_bytes / BYTES_PER_GB
    }
}

/// Filter for `GET /v0/workflows`.
///
/// `page` picks the page `list` fetches and the first page `pages`
/// streams; unset means page 1. `list_all` always walks from page 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ListWorkflowParams {
    pub kind: Option<WorkflowKind>,
    /// Substring match on workflow names.
    pub search: Option<String>,
    pub status: Vec<WorkflowStatus>,
    pub page: Option<u32>,
    pub size: u32,
}

impl Default for ListWorkflowParams {
    fn default() -> Self {
        Self {
            kind: None,
            search: None,
            status: Vec::new(),
            page: None,
            size: 10,
        }
    }
}

impl ListWorkflowParams {
    /// Filter by kind.
    pub fn kind(kind: WorkflowKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Fetch a single page.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Restrict to names containing `search`.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Add a status to the filter.
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status.push(status);
        self
    }

    /// Query pairs excluding `page` and `size`.
    pub(crate) fn filter_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = &self.kind {
            query.push(("kind", kind.to_string()));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        for status in &self.status {
            query.push(("status", status.to_string()));
        }
        query
    }
}
