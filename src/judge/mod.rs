//! Toolchain adapters.
//!
//! The sandbox core stays toolchain-agnostic. Adapters define the compile,
//! syntax-check and run command lines.

pub mod adapter;
pub mod languages;
