//! # Neogate Core
//!
//! Data model shared by the neogate HTTP gateway and its storage-network
//! boundary.
//!
//! This crate provides:
//! - **Identifiers**: Container, object and owner IDs with strict parsing
//! - **Attributes**: Object attributes and the header ⇄ attribute key mapping
//! - **Bearer tokens**: The signed credential carried by upload/download calls
//! - **Selectors**: How a request addresses object(s) inside a container
//! - **Expiration**: Expiration header parsing and epoch arithmetic
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           HTTP Gateway (cli)            │
//! ├─────────────────────────────────────────┤
//! │   Selector │ Attributes │ Expiration    │
//! ├─────────────────────────────────────────┤
//! │     Identifiers │ Bearer Token          │
//! ├─────────────────────────────────────────┤
//! │        Storage network (network)        │
//! └─────────────────────────────────────────┘
//! ```

pub mod attribute;
pub mod error;
pub mod expiration;
pub mod id;
pub mod netinfo;
pub mod selector;
pub mod token;

pub use attribute::{Attribute, AttributeKind};
pub use error::{CoreError, Result};
pub use expiration::{ExpirationForm, ExpirationResolver};
pub use id::{Address, ContainerId, ObjectId, OwnerId};
pub use netinfo::{NetworkInfo, NetworkParameter};
pub use selector::Selector;
pub use token::BearerToken;
