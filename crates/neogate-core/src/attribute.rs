//! Object attributes and their HTTP header representation
//!
//! Attributes cross the HTTP boundary as `X-Attribute-<key>` headers. Network
//! system attributes live under the `__NEOFS__` prefix on the wire and are
//! spelled `Neofs-Title-Case` in headers:
//!
//! ```text
//! X-Attribute-Neofs-Expiration-Epoch  <->  __NEOFS__EXPIRATION_EPOCH
//! ```

use serde::{Deserialize, Serialize};

/// Prefix of HTTP headers mapped to object attributes
pub const USER_ATTRIBUTE_HEADER_PREFIX: &str = "X-Attribute-";

/// Header spelling that marks a system attribute
pub const SYSTEM_HEADER_ALIAS: &str = "Neofs-";

/// Wire prefix of network-reserved attributes
pub const SYSTEM_ATTRIBUTE_PREFIX: &str = "__NEOFS__";

/// Epoch after which the network may drop the object
pub const ATTRIBUTE_EXPIRATION_EPOCH: &str = "__NEOFS__EXPIRATION_EPOCH";

/// Original file name of the payload
pub const ATTRIBUTE_FILE_NAME: &str = "FileName";

/// Creation time, Unix seconds
pub const ATTRIBUTE_TIMESTAMP: &str = "Timestamp";

/// Explicit MIME type of the payload
pub const ATTRIBUTE_CONTENT_TYPE: &str = "Content-Type";

/// A key/value pair attached to an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Meaning of an attribute key as far as the gateway is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    FileName,
    Timestamp,
    ExpirationEpoch,
    ContentType,
    /// Pass-through user attribute
    Opaque,
}

impl AttributeKind {
    /// Classify a wire attribute key
    pub fn of(key: &str) -> Self {
        match key {
            ATTRIBUTE_FILE_NAME => Self::FileName,
            ATTRIBUTE_TIMESTAMP => Self::Timestamp,
            ATTRIBUTE_EXPIRATION_EPOCH => Self::ExpirationEpoch,
            ATTRIBUTE_CONTENT_TYPE => Self::ContentType,
            _ => Self::Opaque,
        }
    }
}

/// Whether the wire key is network-reserved
pub fn is_system_key(key: &str) -> bool {
    key.starts_with(SYSTEM_ATTRIBUTE_PREFIX)
}

/// Strip the `X-Attribute-` prefix from a header name, case-insensitively.
pub fn strip_user_attribute_prefix(header_name: &str) -> Option<&str> {
    let prefix_len = USER_ATTRIBUTE_HEADER_PREFIX.len();
    if header_name.len() <= prefix_len || !header_name.is_char_boundary(prefix_len) {
        return None;
    }
    let (prefix, rest) = header_name.split_at(prefix_len);
    prefix
        .eq_ignore_ascii_case(USER_ATTRIBUTE_HEADER_PREFIX)
        .then_some(rest)
}

fn strip_system_alias(key: &str) -> Option<&str> {
    let alias_len = SYSTEM_HEADER_ALIAS.len();
    if key.len() <= alias_len || !key.is_char_boundary(alias_len) {
        return None;
    }
    let (alias, rest) = key.split_at(alias_len);
    alias.eq_ignore_ascii_case(SYSTEM_HEADER_ALIAS).then_some(rest)
}

/// Canonical header casing: first letter of every hyphen-separated word
/// uppercase, the rest lowercase.
pub fn title_case(key: &str, separator: char) -> String {
    key.split(separator)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Convert the part of a header name after `X-Attribute-` into the attribute
/// key stored on the network.
///
/// `Neofs-*` spellings become system keys (`Neofs-Expiration-Epoch` →
/// `__NEOFS__EXPIRATION_EPOCH`). Well-known keys are matched
/// case-insensitively and stored under their canonical spelling; anything
/// else is stored in canonical header case.
pub fn attribute_key_from_header(suffix: &str) -> String {
    if let Some(system) = strip_system_alias(suffix) {
        return format!(
            "{SYSTEM_ATTRIBUTE_PREFIX}{}",
            system.replace('-', "_").to_uppercase()
        );
    }

    for known in [ATTRIBUTE_FILE_NAME, ATTRIBUTE_TIMESTAMP, ATTRIBUTE_CONTENT_TYPE] {
        if suffix.eq_ignore_ascii_case(known) {
            return known.to_string();
        }
    }

    title_case(suffix, '-')
}

/// Convert a wire attribute key into the header key placed after
/// `X-Attribute-`. Inverse of [`attribute_key_from_header`] for system keys.
pub fn header_key_from_attribute(key: &str) -> String {
    match key.strip_prefix(SYSTEM_ATTRIBUTE_PREFIX) {
        Some(system) => format!("{SYSTEM_HEADER_ALIAS}{}", title_case(system, '_')),
        None => key.to_string(),
    }
}

/// Whether `s` can be sent as a raw header name (RFC 7230 token).
pub fn is_valid_header_key(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c > ' ' && c < '\u{7f}' && !"()<>@,;:\\\"/[]?={}".contains(c)
        })
}

/// Whether `s` can be sent as a raw header value without escaping.
pub fn is_valid_header_value(s: &str) -> bool {
    s.chars().all(|c| c >= ' ' && c < '\u{7f}' && c != '"')
}
