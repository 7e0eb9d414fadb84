//! # Neogate
//!
//! HTTP gateway to an attribute-addressable object storage network.
//!
//! This crate provides:
//! - **Uploads**: multipart bodies become objects, `X-Attribute-*` headers
//!   become attributes, relative expirations become network epochs
//! - **Downloads**: objects selected by ID, by attribute or by filename
//!   prefix, streamed back with their attributes as headers
//! - **Archives**: every object under a filename prefix as one zip stream
//! - **Bearer tokens**: from the `Authorization` header or the `Bearer` cookie
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! │              (browsers, curl, etc.)                 │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                      Neogate                        │
//! ├─────────────────────────────────────────────────────┤
//! │  Request ID │ Logging │ Bearer Token Resolver       │
//! ├─────────────────────────────────────────────────────┤
//! │  Upload Composer │ Object Selector │ Sniffer │ Zip  │
//! ├─────────────────────────────────────────────────────┤
//! │                   neogate-core                      │
//! │     (IDs, attributes, tokens, expiration epochs)    │
//! ├─────────────────────────────────────────────────────┤
//! │                  neogate-network                    │
//! │          (NeoFs client trait, memory network)       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod compose;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod selection;
pub mod server;
pub mod sniff;
pub mod state;

pub use config::GatewayConfig;
pub use error::{ApiError, GatewayErrorCode};
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
