//! Textual encodings of a package definition.

use serde::de::{self, DeserializeOwned, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while encoding or decoding a definition.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown manifest format '{0}', expected 'json' or 'yaml'")]
    UnknownFormat(String),
}

/// The two interchangeable package definition formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestFormat {
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Formats in the order a directory is probed for a definition file.
    pub const PROBE_ORDER: [Self; 2] = [Self::Json, Self::Yaml];

    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Name of the definition file in this format.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Json => "pawn.json",
            Self::Yaml => "pawn.yaml",
        }
    }

    /// Decode `content`, rejecting keys the target type does not declare.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed or does not match `T`.
    pub fn decode<T: DeserializeOwned>(self, content: &str) -> Result<T, CodecError> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Encode `value`. JSON output is indented with tabs.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in this format.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Json => {
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                value.serialize(&mut ser)?;
                Ok(buf)
            }
            Self::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ManifestFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(CodecError::UnknownFormat(s.to_string())),
        }
    }
}

struct ScalarOrSequence;

impl<'de> Visitor<'de> for ScalarOrSequence {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a scalar, or a sequence")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut len = 0usize;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            len += 1;
        }
        tracing::warn!(
            len,
            "expected a string but found a sequence, leaving the field unset"
        );
        Ok(None)
    }
}

/// Deserialize a string field that older definitions sometimes wrote as a
/// list. A list carries no usable value for the field, so it decodes as
/// unset and a warning is logged instead of failing the whole definition.
/// Other scalars (numbers, booleans) are kept as their string form.
pub(crate) fn scalar_or_sequence<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(ScalarOrSequence)
}
