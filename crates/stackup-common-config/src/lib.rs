//! Configuration types for stackup.
//!
//! This crate provides the configuration used by the `stackup` CLI,
//! normally read from `~/.stackup/config.yaml`.

pub mod env;
pub mod loader;
pub mod types;


pub use env::*;
pub use loader::*;
pub use types::*;
