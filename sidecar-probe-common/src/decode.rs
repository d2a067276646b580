//! Permissive decoding of Envoy admin JSON.
//!
//! Decoding happens in three passes over the response text:
//!
//! 1. parse into a JSON tree (syntax errors are [`DecodeError::Malformed`]);
//! 2. resolve every `@type` in the tree against a [`TypeRegistry`]
//!    ([`DecodeError::UnresolvableType`]) and let the target message check
//!    its embedded payloads for a missing discriminator
//!    ([`DecodeError::MissingTypeDiscriminator`]);
//! 3. map the tree onto the target type, ignoring unknown fields.
//!
//! The two middle-pass failures are structural: the same response will
//! never decode no matter how often it is fetched again.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::admin::AdminMessage;

/// Type URL prefix used by the proto3 JSON mapping.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Proto packages a sidecar build knows how to resolve by default.
///
/// Besides the Envoy API this covers the filters Istio compiles into its
/// proxy: `stats.PluginConfig` (telemetry) and `io.istio.*` (peer metadata
/// and friends).
pub const DEFAULT_PACKAGES: &[&str] = &[
    "envoy.",
    "istio.",
    "io.istio.",
    "stats.",
    "udpa.",
    "xds.",
    "google.protobuf.",
    "google.rpc.",
];

/// Reasons an admin response could not be mapped onto its message type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// An embedded payload names a type this client cannot resolve.
    #[error("could not resolve Any message type: {type_url}")]
    UnresolvableType { type_url: String },

    /// An embedded payload carries no `@type` at all (legacy output format).
    #[error("Any JSON doesn't have '@type' at {location}")]
    MissingTypeDiscriminator { location: String },

    /// Syntax error or a known field with the wrong shape.
    #[error("{0}")]
    Malformed(String),
}

impl DecodeError {
    /// Whether re-fetching can never make this response decode.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableType { .. } | Self::MissingTypeDiscriminator { .. }
        )
    }
}

/// The set of message types the decoder can resolve from an `@type` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRegistry {
    packages: Vec<String>,
    types: BTreeSet<String>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            packages: DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect(),
            types: BTreeSet::new(),
        }
    }
}

impl TypeRegistry {
    /// A registry that resolves nothing until types are added.
    pub fn empty() -> Self {
        Self {
            packages: Vec::new(),
            types: BTreeSet::new(),
        }
    }

    /// Resolve every type under `package` (e.g. `"acme.filters."`).
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    /// Resolve one fully-qualified message name.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.insert(type_name.into());
        self
    }

    /// Resolve a type URL to its message name.
    pub fn resolve<'a>(&self, type_url: &'a str) -> Result<&'a str, DecodeError> {
        let unresolvable = || DecodeError::UnresolvableType {
            type_url: type_url.to_string(),
        };
        let (_, name) = type_url.rsplit_once('/').ok_or_else(unresolvable)?;
        if name.is_empty() {
            return Err(unresolvable());
        }
        let known = self.types.contains(name)
            || self.packages.iter().any(|p| name.starts_with(p.as_str()));
        if known { Ok(name) } else { Err(unresolvable()) }
    }

    /// Resolve every `@type` found anywhere in `value`.
    pub fn resolve_tree(&self, value: &Value) -> Result<(), DecodeError> {
        match value {
            Value::Object(map) => {
                if let Some(type_url) = map.get("@type") {
                    match type_url.as_str() {
                        Some(url) => {
                            self.resolve(url)?;
                        }
                        None => {
                            return Err(DecodeError::UnresolvableType {
                                type_url: type_url.to_string(),
                            });
                        }
                    }
                }
                map.values().try_for_each(|child| self.resolve_tree(child))
            }
            Value::Array(items) => items.iter().try_for_each(|item| self.resolve_tree(item)),
            _ => Ok(()),
        }
    }
}

/// Decodes admin responses into their message types.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    registry: TypeRegistry,
}

impl Decoder {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Decode `text` into `M`, tolerating fields `M` does not declare.
    pub fn decode<M: AdminMessage>(&self, text: &str) -> Result<M, DecodeError> {
        let raw: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        self.registry.resolve_tree(&raw)?;
        M::check_discriminators(&raw)?;
        serde_json::from_value(raw).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Render a message as two-space indented JSON for diagnostics.
pub fn render<M: Serialize>(message: &M) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(message)
}
