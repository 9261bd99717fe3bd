//! ZDAO Types - Identifier types shared by the governance engine.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded account identifiers)
//! - Hashes (32-byte blake3 digests used for proposal and operation ids)

pub mod address;
pub mod hash;
pub mod error;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use hash::Hash;
pub use error::TypesError;
