//! Cleartool integration for the COOL UCM client.
//!
//! This crate is the only place that spawns processes. Everything above it
//! talks to the backing store through the [`CommandRunner`] trait, so a
//! [`ScriptedRunner`] can stand in for a real ClearCase installation.

pub mod commands;
pub mod scripted;

pub use commands::{Cleartool, CommandError, CommandOutput, CommandRunner, Result};
pub use scripted::ScriptedRunner;
