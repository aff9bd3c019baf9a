//! Tri-state optional fields.
//!
//! Request bodies must tell "not provided" apart from "explicitly null":
//! moving a file to the root directory sends `"parent_id": null`, while a
//! rename leaves `parent_id` out entirely. Fields of type [`Presence`] are
//! declared with
//! `#[serde(default, skip_serializing_if = "Presence::is_unset")]` so that
//! `Unset` never reaches the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that may be absent, explicitly null, or set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Presence<T> {
    /// Not provided; omitted from the serialized body.
    #[default]
    Unset,
    /// Provided as null.
    Null,
    /// Provided with a value.
    Value(T),
}

impl<T> Presence<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Presence::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Presence::Null)
    }

    /// The value, if one was provided.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    /// `None` becomes `Null`, `Some(v)` becomes `Value(v)`.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Presence::Null, Presence::Value)
    }
}

impl<T> From<T> for Presence<T> {
    fn from(value: T) -> Self {
        Presence::Value(value)
    }
}

impl<T: Serialize> Serialize for Presence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Presence::Value(v) => v.serialize(serializer),
            Presence::Unset | Presence::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Presence<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Presence::from_option)
    }
}
