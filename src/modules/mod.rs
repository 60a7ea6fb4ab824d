//! Modules layer - Infrastructure components
//!
//! Contains the private file storage adapter and the download link signer.

pub mod signing;
pub mod storage;
