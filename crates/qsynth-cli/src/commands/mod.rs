//! CLI command implementations.

pub mod common;
pub mod modmul;
pub mod resources;
pub mod shift;
pub mod version;
