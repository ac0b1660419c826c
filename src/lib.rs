// ABOUTME: Library root for kindle - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod helm;
pub mod install;
pub mod output;
pub mod pods;
pub mod process;
pub mod runtime;
pub mod types;
