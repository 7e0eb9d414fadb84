//! Addressing objects inside a container

use crate::{CoreError, ObjectId, Result};
use std::fmt;

/// How a request names its target object(s)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Direct object ID
    ById(ObjectId),
    /// Exact attribute match
    ByAttribute { key: String, value: String },
    /// `FileName` attribute starting with the prefix
    ByFilenamePrefix(String),
}

impl Selector {
    /// Parse an object ID path segment
    pub fn by_id(raw: &str) -> Result<Self> {
        raw.parse::<ObjectId>()
            .map(Self::ById)
            .map_err(|e| CoreError::InvalidSelector(e.to_string()))
    }

    pub fn by_attribute(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(CoreError::InvalidSelector("empty attribute key".into()));
        }
        if value.is_empty() {
            return Err(CoreError::InvalidSelector(format!(
                "empty value for attribute {key:?}"
            )));
        }
        Ok(Self::ByAttribute { key, value })
    }

    pub fn by_filename_prefix(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(CoreError::InvalidSelector("empty filename prefix".into()));
        }
        Ok(Self::ByFilenamePrefix(prefix))
    }

    /// Responses for filename-keyed selection omit owner and container headers
    pub fn is_filename_keyed(&self) -> bool {
        matches!(self, Self::ByFilenamePrefix(_))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "id={id}"),
            Self::ByAttribute { key, value } => write!(f, "{key}={value}"),
            Self::ByFilenamePrefix(prefix) => write!(f, "FileName^={prefix}"),
        }
    }
}
