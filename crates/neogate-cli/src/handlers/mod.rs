//! Gateway request handlers

pub mod archive;
pub mod download;
pub mod service;
pub mod upload;

pub use archive::*;
pub use download::*;
pub use service::*;
pub use upload::*;
