//! Sandbox core.
//!
//! Owns the write, compile, run lifecycle of one untrusted program.
//! Toolchain-specific command lines live in judge adapters.

pub mod sandbox;
