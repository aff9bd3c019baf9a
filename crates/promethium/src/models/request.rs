//! Typed workflow submission requests.
//!
//! On the wire a request is a flat JSON object with `kind` naming the
//! calculation and `parameters` holding its kind-specific input:
//!
//! ```json
//! {
//!   "name": "benzaldehyde-go",
//!   "version": "v1",
//!   "kind": "GeometryOptimization",
//!   "parameters": {
//!     "molecule": {"base64data": "...", "filetype": "xyz"},
//!     "system": {...},
//!     "go": {...}
//!   },
//!   "resources": {"gpu_type": "a100", "gpu_count": 1}
//! }
//! ```
//!
//! Molecule inputs are typed and checked by [`WorkflowRequest::validate`];
//! every other parameter section passes through as JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::file::SUPPORTED_FILE_EXTENSIONS;
use super::presence::Presence;
use super::workflow::WorkflowKind;
use crate::codec;
use crate::error::{PromethiumError, PromethiumResult};

/// Request schema version sent when none is given.
const DEFAULT_VERSION: &str = "v1";

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// A molecule embedded in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeInput {
    /// Base64 structure file content.
    pub base64data: String,
    /// Structure format: `xyz`, `smi`, `sdf`, `pdb`, ...
    pub filetype: String,
    /// Format-specific options such as charge or multiplicity.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl MoleculeInput {
    /// Encode a structure file's text.
    pub fn from_text(text: impl AsRef<[u8]>, filetype: impl Into<String>) -> Self {
        Self {
            base64data: codec::encode(text),
            filetype: filetype.into(),
            params: Map::new(),
        }
    }

    /// Attach a format option.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn validate(&self, field: &str) -> PromethiumResult<()> {
        let filetype = self.filetype.to_ascii_lowercase();
        if !SUPPORTED_FILE_EXTENSIONS.contains(&filetype.as_str()) {
            return Err(PromethiumError::Validation(format!(
                "{field}: unsupported filetype '{}'",
                self.filetype
            )));
        }
        let bytes = codec::decode_bytes(&self.base64data)
            .map_err(|e| PromethiumError::Validation(format!("{field}: {e}")))?;
        if bytes.is_empty() {
            return Err(PromethiumError::Validation(format!("{field}: molecule is empty")));
        }
        Ok(())
    }
}

/// Parameters for kinds that take one molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleMoleculeParameters {
    pub molecule: MoleculeInput,
    /// Remaining sections (`system`, `hf`, `go`, `conf_search`, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Parameters for kinds that take two interacting molecules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimerParameters {
    pub molecule_a: MoleculeInput,
    pub molecule_b: MoleculeInput,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Parameters for kinds that connect a reactant to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointParameters {
    pub reactant: MoleculeInput,
    pub product: MoleculeInput,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Parameters passed through without molecule checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpenParameters(pub Map<String, Value>);

/// Kind-specific input, one variant per [`WorkflowKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowParameters {
    TorsionScan(SingleMoleculeParameters),
    ConformerSearch(SingleMoleculeParameters),
    SinglePointCalculation(SingleMoleculeParameters),
    GeometryOptimization(SingleMoleculeParameters),
    TransitionStateOptimization(SingleMoleculeParameters),
    InteractionEnergyCalculation(DimerParameters),
    FsaptCalculation(DimerParameters),
    FragmentedInteractionEnergy(DimerParameters),
    ReactionPathOptimization(EndpointParameters),
    TransitionStateOptimizationFromEndpoints(EndpointParameters),
    QuantumChemicalScoring(OpenParameters),
    /// A kind this client does not model.
    Other {
        kind: String,
        parameters: OpenParameters,
    },
}

impl WorkflowParameters {
    /// The kind tag these parameters are sent under.
    pub fn kind(&self) -> WorkflowKind {
        use WorkflowParameters as P;
        match self {
            P::TorsionScan(_) => WorkflowKind::TorsionScan,
            P::ConformerSearch(_) => WorkflowKind::ConformerSearch,
            P::SinglePointCalculation(_) => WorkflowKind::SinglePointCalculation,
            P::GeometryOptimization(_) => WorkflowKind::GeometryOptimization,
            P::TransitionStateOptimization(_) => WorkflowKind::TransitionStateOptimization,
            P::InteractionEnergyCalculation(_) => WorkflowKind::InteractionEnergyCalculation,
            P::FsaptCalculation(_) => WorkflowKind::FsaptCalculation,
            P::FragmentedInteractionEnergy(_) => WorkflowKind::FragmentedInteractionEnergy,
            P::ReactionPathOptimization(_) => WorkflowKind::ReactionPathOptimization,
            P::TransitionStateOptimizationFromEndpoints(_) => {
                WorkflowKind::TransitionStateOptimizationFromEndpoints
            }
            P::QuantumChemicalScoring(_) => WorkflowKind::QuantumChemicalScoring,
            P::Other { kind, .. } => WorkflowKind::Other(kind.clone()),
        }
    }

    /// Parse the `parameters` object sent under `kind`.
    pub fn from_kind(kind: WorkflowKind, parameters: Value) -> PromethiumResult<Self> {
        use WorkflowParameters as P;
        let parsed = match kind {
            WorkflowKind::TorsionScan => P::TorsionScan(serde_json::from_value(parameters)?),
            WorkflowKind::ConformerSearch => P::ConformerSearch(serde_json::from_value(parameters)?),
            WorkflowKind::SinglePointCalculation => {
                P::SinglePointCalculation(serde_json::from_value(parameters)?)
            }
            WorkflowKind::GeometryOptimization => {
                P::GeometryOptimization(serde_json::from_value(parameters)?)
            }
            WorkflowKind::TransitionStateOptimization => {
                P::TransitionStateOptimization(serde_json::from_value(parameters)?)
            }
            WorkflowKind::InteractionEnergyCalculation => {
                P::InteractionEnergyCalculation(serde_json::from_value(parameters)?)
            }
            WorkflowKind::FsaptCalculation => P::FsaptCalculation(serde_json::from_value(parameters)?),
            WorkflowKind::FragmentedInteractionEnergy => {
                P::FragmentedInteractionEnergy(serde_json::from_value(parameters)?)
            }
            WorkflowKind::ReactionPathOptimization => {
                P::ReactionPathOptimization(serde_json::from_value(parameters)?)
            }
            WorkflowKind::TransitionStateOptimizationFromEndpoints => {
                P::TransitionStateOptimizationFromEndpoints(serde_json::from_value(parameters)?)
            }
            WorkflowKind::QuantumChemicalScoring => {
                P::QuantumChemicalScoring(serde_json::from_value(parameters)?)
            }
            WorkflowKind::Other(kind) => P::Other {
                kind,
                parameters: serde_json::from_value(parameters)?,
            },
        };
        Ok(parsed)
    }

    /// Serialize the `parameters` object.
    pub fn to_value(&self) -> PromethiumResult<Value> {
        use WorkflowParameters as P;
        let value = match self {
            P::TorsionScan(p)
            | P::ConformerSearch(p)
            | P::SinglePointCalculation(p)
            | P::GeometryOptimization(p)
            | P::TransitionStateOptimization(p) => serde_json::to_value(p)?,
            P::InteractionEnergyCalculation(p)
            | P::FsaptCalculation(p)
            | P::FragmentedInteractionEnergy(p) => serde_json::to_value(p)?,
            P::ReactionPathOptimization(p) | P::TransitionStateOptimizationFromEndpoints(p) => {
                serde_json::to_value(p)?
            }
            P::QuantumChemicalScoring(p) | P::Other { parameters: p, .. } => {
                serde_json::to_value(p)?
            }
        };
        Ok(value)
    }

    /// Every typed molecule input, with its field name.
    fn molecules(&self) -> Vec<(&'static str, &MoleculeInput)> {
        use WorkflowParameters as P;
        match self {
            P::TorsionScan(p)
            | P::ConformerSearch(p)
            | P::SinglePointCalculation(p)
            | P::GeometryOptimization(p)
            | P::TransitionStateOptimization(p) => vec![("molecule", &p.molecule)],
            P::InteractionEnergyCalculation(p)
            | P::FsaptCalculation(p)
            | P::FragmentedInteractionEnergy(p) => {
                vec![("molecule_a", &p.molecule_a), ("molecule_b", &p.molecule_b)]
            }
            P::ReactionPathOptimization(p) | P::TransitionStateOptimizationFromEndpoints(p) => {
                vec![("reactant", &p.reactant), ("product", &p.product)]
            }
            P::QuantumChemicalScoring(_) | P::Other { .. } => Vec::new(),
        }
    }
}

/// GPU allocation for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// `a100` or `v100`.
    pub gpu_type: String,
    pub gpu_count: u32,
}

impl ResourceRequest {
    pub fn new(gpu_type: impl Into<String>, gpu_count: u32) -> Self {
        Self {
            gpu_type: gpu_type.into(),
            gpu_count,
        }
    }
}

/// Server-side time limits, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout: Option<u64>,
}

/// A workflow submission, also accepted by the memory estimator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawWorkflowRequest")]
pub struct WorkflowRequest {
    pub name: String,
    pub version: String,
    pub parameters: WorkflowParameters,
    pub resources: Presence<ResourceRequest>,
    pub metadata: Option<WorkflowMetadata>,
    pub description: Presence<String>,
}

impl WorkflowRequest {
    pub fn new(name: impl Into<String>, parameters: WorkflowParameters) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            parameters,
            resources: Presence::Unset,
            metadata: None,
            description: Presence::Unset,
        }
    }

    /// Parse a raw JSON workflow definition.
    pub fn from_json(json: &str) -> PromethiumResult<Self> {
        let raw: RawWorkflowRequest = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    pub fn with_resources(mut self, resources: ResourceRequest) -> Self {
        self.resources = Presence::Value(resources);
        self
    }

    pub fn with_metadata(mut self, metadata: WorkflowMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Presence::Value(description.into());
        self
    }

    pub fn kind(&self) -> WorkflowKind {
        self.parameters.kind()
    }

    /// Check the request before it is sent.
    pub fn validate(&self) -> PromethiumResult<()> {
        if self.name.trim().is_empty() {
            return Err(PromethiumError::Validation("name must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(PromethiumError::Validation("version must not be empty".into()));
        }
        for (field, molecule) in self.parameters.molecules() {
            molecule.validate(&format!("parameters.{field}"))?;
        }
        if let Presence::Value(resources) = &self.resources {
            if resources.gpu_count == 0 {
                return Err(PromethiumError::Validation(
                    "resources.gpu_count must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Incoming wire shape of [`WorkflowRequest`].
#[derive(Debug, Clone, Deserialize)]
struct RawWorkflowRequest {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    kind: WorkflowKind,
    #[serde(default)]
    parameters: Value,
    #[serde(default, skip_serializing_if = "Presence::is_unset")]
    resources: Presence<ResourceRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<WorkflowMetadata>,
    #[serde(default, skip_serializing_if = "Presence::is_unset")]
    description: Presence<String>,
}

impl TryFrom<RawWorkflowRequest> for WorkflowRequest {
    type Error = PromethiumError;

    fn try_from(raw: RawWorkflowRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: raw.name,
            version: raw.version,
            parameters: WorkflowParameters::from_kind(raw.kind, raw.parameters)?,
            resources: raw.resources,
            metadata: raw.metadata,
            description: raw.description,
        })
    }
}

/// Outgoing wire shape of [`WorkflowRequest`], borrowing its fields.
#[derive(Serialize)]
struct WireWorkflowRequest<'a> {
    name: &'a str,
    version: &'a str,
    kind: WorkflowKind,
    parameters: Value,
    #[serde(skip_serializing_if = "is_unset")]
    resources: &'a Presence<ResourceRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a WorkflowMetadata>,
    #[serde(skip_serializing_if = "is_unset")]
    description: &'a Presence<String>,
}

fn is_unset<T>(presence: &&Presence<T>) -> bool {
    presence.is_unset()
}

impl Serialize for WorkflowRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let parameters = self
            .parameters
            .to_value()
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        WireWorkflowRequest {
            name: &self.name,
            version: &self.version,
            kind: self.parameters.kind(),
            parameters,
            resources: &self.resources,
            metadata: self.metadata.as_ref(),
            description: &self.description,
        }
        .serialize(serializer)
    }
}
