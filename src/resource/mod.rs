//! Declarative resources received from the control plane
//!
//! A resource travels as an untyped JSON envelope:
//!
//! ```text
//! {"type": "application" | "configuration" | <other>,
//!  "name": "...", "version": "...", "value": {...}}
//! ```
//!
//! Decoding recovers the discriminator and parses `value` into the matching
//! typed payload. Unrecognized types decode successfully with no payload.
//! The exact input bytes are always retained in [`Resource::data`].

pub mod models;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

pub use models::{Application, Configuration, StorageObject};

/// Resource kind discriminator
///
/// Closed to the known kinds at decode time; anything else is kept verbatim
/// in `Unknown` so it can still be logged and echoed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Application,
    Configuration,
    Unknown(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Application => "application",
            ResourceType::Configuration => "configuration",
            ResourceType::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ResourceType::Unknown(_))
    }

    fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for ResourceType {
    fn default() -> Self {
        ResourceType::Unknown(String::new())
    }
}

impl From<String> for ResourceType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "application" => ResourceType::Application,
            "configuration" => ResourceType::Configuration,
            _ => ResourceType::Unknown(raw),
        }
    }
}

impl From<&str> for ResourceType {
    fn from(raw: &str) -> Self {
        ResourceType::from(raw.to_string())
    }
}

impl From<ResourceType> for String {
    fn from(kind: ResourceType) -> Self {
        match kind {
            ResourceType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a resource in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Identity plus version, without a body
///
/// Used on the wire in desire requests; an empty version asks for the
/// current body whatever it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResource {
    #[serde(rename = "type", default, skip_serializing_if = "ResourceType::is_empty")]
    pub kind: ResourceType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl BaseResource {
    pub fn new(kind: ResourceType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind.clone(), self.name.clone())
    }
}

/// Typed payload, fixed at decode time to match the resource kind
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    Application(Application),
    Configuration(Configuration),
    Unknown,
}

/// A fully decoded resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    base: BaseResource,
    data: Vec<u8>,
    value: ResourceValue,
}

/// Wire shape used while decoding; `value` is borrowed unparsed so it can be
/// routed by kind.
#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type", default)]
    kind: ResourceType,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(borrow, default)]
    value: Option<&'a RawValue>,
}

impl Resource {
    /// Decode a resource from its wire bytes.
    ///
    /// Fails only when the envelope itself is not parseable, or when a known
    /// kind carries a `value` of the wrong shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let envelope: Envelope<'_> =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let value = match envelope.kind {
            ResourceType::Application => {
                ResourceValue::Application(parse_value(envelope.value)?)
            }
            ResourceType::Configuration => {
                ResourceValue::Configuration(parse_value(envelope.value)?)
            }
            ResourceType::Unknown(_) => ResourceValue::Unknown,
        };

        Ok(Self {
            base: BaseResource {
                kind: envelope.kind,
                name: envelope.name,
                version: envelope.version,
            },
            data: bytes.to_vec(),
            value,
        })
    }

    pub fn base(&self) -> &BaseResource {
        &self.base
    }

    pub fn kind(&self) -> &ResourceType {
        &self.base.kind
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn version(&self) -> &str {
        &self.base.version
    }

    pub fn key(&self) -> ResourceKey {
        self.base.key()
    }

    /// The bytes this resource was decoded from
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn value(&self) -> &ResourceValue {
        &self.value
    }

    pub fn as_application(&self) -> Option<&Application> {
        match &self.value {
            ResourceValue::Application(app) => Some(app),
            _ => None,
        }
    }

    pub fn as_configuration(&self) -> Option<&Configuration> {
        match &self.value {
            ResourceValue::Configuration(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Soft check for kinds this agent cannot act on
    pub fn ensure_known(&self) -> Result<(), DecodeError> {
        match &self.base.kind {
            ResourceType::Unknown(raw) => Err(DecodeError::UnknownType(raw.clone())),
            _ => Ok(()),
        }
    }
}

fn parse_value<T: DeserializeOwned + Default>(raw: Option<&RawValue>) -> Result<T, DecodeError> {
    match raw {
        Some(raw) => {
            serde_json::from_str(raw.get()).map_err(|e| DecodeError::Malformed(e.to_string()))
        }
        None => Ok(T::default()),
    }
}

/// Resource decode errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed resource: {0}")]
    Malformed(String),

    /// Not fatal: the resource decoded but its kind is not handled here
    #[error("Unknown resource type: {0:?}")]
    UnknownType(String),
}
