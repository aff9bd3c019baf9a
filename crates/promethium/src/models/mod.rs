//! Wire types for the Promethium API.

/// Declare a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Declare a string-labelled enum with a catch-all `Other` variant.
///
/// Known labels parse case-insensitively and serialize in their canonical
/// spelling. Anything else is kept verbatim in `Other` and serializes back
/// exactly as received.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A label this client does not recognize.
            Other(String),
        }

        impl $name {
            /// Every label this client recognizes.
            pub const KNOWN: &'static [&'static str] = &[$($label),+];

            /// The wire label.
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(s) => s,
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($label) {
                    return Ok($name::$variant);
                })+
                Ok($name::Other(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.parse() {
                    Ok(v) => v,
                    Err(never) => match never {},
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <String as serde::Deserialize>::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

pub(crate) use labelled_enum;
pub(crate) use string_id;

mod file;
mod presence;
mod request;
mod workflow;

pub use file::{
    CreateFileRequest, FileId, FileMetadata, ListFileParams, SUPPORTED_FILE_EXTENSIONS,
    UpdateFileRequest, is_supported_extension,
};
pub use presence::Presence;
pub use request::{
    DimerParameters, EndpointParameters, MoleculeInput, OpenParameters, ResourceRequest,
    SingleMoleculeParameters, WorkflowMetadata, WorkflowParameters, WorkflowRequest,
};
pub use workflow::{
    BYTES_PER_GB, ListWorkflowParams, MemoryEstimate, StatusVocabulary, Workflow, WorkflowId,
    WorkflowKind, WorkflowResult, WorkflowStatus,
};
