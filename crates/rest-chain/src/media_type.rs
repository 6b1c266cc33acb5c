//! Media types: wire names plus the codec each one implies

use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Codec failures for a single media type
#[derive(Error, Debug)]
pub enum MediaTypeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("text error: {0}")]
    Text(#[from] serde::de::value::Error),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// `text/plain` only carries strings, numbers and booleans
    #[error("text/plain cannot carry a {0} value")]
    NotScalar(&'static str),

    #[error("unknown media type: {0}")]
    Unknown(String),
}

/// Content classifier used for the `Accept` and `Content-Type` headers.
///
/// The accept type also decides how a response payload is decoded into
/// result containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaType {
    #[default]
    ApplicationJson,
    ApplicationYaml,
    TextPlain,
}

impl MediaType {
    /// Name sent on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::ApplicationJson => "application/json",
            Self::ApplicationYaml => "application/x-yaml",
            Self::TextPlain => "text/plain",
        }
    }

    /// Case-insensitive containment test against a `Content-Type` header value.
    ///
    /// Parameters such as `; charset=utf-8` are tolerated because only
    /// containment is checked.
    pub fn matches(&self, content_type: &str) -> bool {
        content_type
            .to_ascii_lowercase()
            .contains(self.wire_name())
    }

    pub fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, MediaTypeError> {
        match self {
            Self::ApplicationJson => Ok(serde_json::to_vec(value)?),
            Self::ApplicationYaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
            Self::TextPlain => match serde_json::to_value(value)? {
                serde_json::Value::String(s) => Ok(s.into_bytes()),
                serde_json::Value::Number(n) => Ok(n.to_string().into_bytes()),
                serde_json::Value::Bool(b) => Ok(b.to_string().into_bytes()),
                serde_json::Value::Null => Err(MediaTypeError::NotScalar("null")),
                serde_json::Value::Array(_) => Err(MediaTypeError::NotScalar("sequence")),
                serde_json::Value::Object(_) => Err(MediaTypeError::NotScalar("map")),
            },
        }
    }

    pub fn unmarshal<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, MediaTypeError> {
        match self {
            Self::ApplicationJson => Ok(serde_json::from_slice(payload)?),
            Self::ApplicationYaml => Ok(serde_yaml::from_slice(payload)?),
            Self::TextPlain => {
                let text = std::str::from_utf8(payload)?;
                let deserializer: StrDeserializer<'_, serde::de::value::Error> =
                    text.into_deserializer();
                match T::deserialize(deserializer) {
                    Ok(value) => Ok(value),
                    // Numbers and booleans travel as their text form
                    Err(err) => match serde_json::from_str(text.trim()) {
                        Ok(scalar @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => {
                            Ok(serde_json::from_value(scalar)?)
                        }
                        _ => Err(err.into()),
                    },
                }
            }
        }
    }

    /// Decode `payload` into an already-allocated result container
    pub fn unmarshal_into(
        &self,
        payload: &[u8],
        target: &mut dyn Entity,
    ) -> Result<(), MediaTypeError> {
        target.fill(*self, payload)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Ok(Self::ApplicationJson),
            "application/x-yaml" | "application/yaml" | "text/yaml" => Ok(Self::ApplicationYaml),
            "text/plain" => Ok(Self::TextPlain),
            _ => Err(MediaTypeError::Unknown(s.to_string())),
        }
    }
}

/// A result container a response payload can be decoded into.
///
/// Implemented for every owned deserializable type, so callers pass plain
/// `&mut T` values. The target is only overwritten when decoding succeeds.
pub trait Entity: Send {
    fn fill(&mut self, media_type: MediaType, payload: &[u8]) -> Result<(), MediaTypeError>;
}

impl<T: DeserializeOwned + Send> Entity for T {
    fn fill(&mut self, media_type: MediaType, payload: &[u8]) -> Result<(), MediaTypeError> {
        *self = media_type.unmarshal(payload)?;
        Ok(())
    }
}
