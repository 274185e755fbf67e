//! Configuration management for the COOL UCM client.
//!
//! This crate loads `.cool/config.yaml`, finds the `.cool/` directory that
//! applies to the working directory, and layers `COOL_*` environment
//! variables on top.

pub mod config;
pub mod cool_dir;
