//! Packtrace - serialization and aggregation line simulator
//!
//! Command-line front end over `packtrace-core`. Every command prints one
//! JSON document on stdout; logs go to stderr.

pub mod cli;
pub mod output;
