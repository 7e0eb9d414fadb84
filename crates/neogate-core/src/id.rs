//! Container, object and owner identifiers
//!
//! Container and object IDs are 32-byte digests. Owner IDs follow the
//! network's wallet address layout: a version byte, a 20-byte script hash and
//! a 4-byte double-SHA256 checksum. All of them travel as lowercase hex.

use crate::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Size of container and object IDs in bytes
pub const ID_SIZE: usize = 32;

/// Size of owner IDs in bytes
pub const OWNER_ID_SIZE: usize = 25;

/// Address version byte expected at the start of every owner ID
pub const OWNER_ID_VERSION: u8 = 0x35;

const SCRIPT_HASH_SIZE: usize = 20;
const CHECKSUM_SIZE: usize = 4;

fn decode_fixed<const N: usize>(s: &str) -> std::result::Result<[u8; N], String> {
    let bytes = hex::decode(s).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected {} bytes, got {}", N, b.len()))
}

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident, $err:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; ID_SIZE]);

        impl $name {
            /// Wrap raw digest bytes
            pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
                Self(bytes)
            }

            /// Raw digest bytes
            pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                decode_fixed::<ID_SIZE>(s)
                    .map(Self)
                    .map_err(|reason| CoreError::$err(format!("{s:?}: {reason}")))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_id!(
    /// Identifier of a container (namespace of objects)
    ContainerId,
    InvalidContainerId
);

digest_id!(
    /// Network-wide identifier of an object
    ObjectId,
    InvalidObjectId
);

/// Identifier of an object owner (bearer token issuer or gateway default)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId([u8; OWNER_ID_SIZE]);

impl OwnerId {
    /// Build an owner ID from a 20-byte script hash
    pub fn from_script_hash(script_hash: [u8; SCRIPT_HASH_SIZE]) -> Self {
        let mut bytes = [0u8; OWNER_ID_SIZE];
        bytes[0] = OWNER_ID_VERSION;
        bytes[1..=SCRIPT_HASH_SIZE].copy_from_slice(&script_hash);
        let checksum = address_checksum(&bytes[..=SCRIPT_HASH_SIZE]);
        bytes[SCRIPT_HASH_SIZE + 1..].copy_from_slice(&checksum);
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; OWNER_ID_SIZE] {
        &self.0
    }
}

fn address_checksum(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut checksum = [0u8; CHECKSUM_SIZE];
    checksum.copy_from_slice(&digest[..CHECKSUM_SIZE]);
    checksum
}

impl FromStr for OwnerId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_fixed::<OWNER_ID_SIZE>(s)
            .map_err(|reason| CoreError::InvalidOwnerId(format!("{s:?}: {reason}")))?;

        if bytes[0] != OWNER_ID_VERSION {
            return Err(CoreError::InvalidOwnerId(format!(
                "{s:?}: unsupported address version {:#04x}",
                bytes[0]
            )));
        }

        let (payload, checksum) = bytes.split_at(SCRIPT_HASH_SIZE + 1);
        if address_checksum(payload) != checksum {
            return Err(CoreError::InvalidOwnerId(format!("{s:?}: checksum mismatch")));
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({self})")
    }
}

impl Serialize for OwnerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Full address of an object: container plus object ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub container: ContainerId,
    pub object: ObjectId,
}

impl Address {
    pub fn new(container: ContainerId, object: ObjectId) -> Self {
        Self { container, object }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.object)
    }
}
