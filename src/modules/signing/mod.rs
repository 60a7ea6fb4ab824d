//! Signing module for download links
//!
//! Stateless, tamper-evident signatures over order/attachment ids and an issue time.

mod link_signer;

pub use link_signer::{LinkRejection, LinkSigner, SignatureAlgorithm};
