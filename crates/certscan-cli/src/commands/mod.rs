//! CLI subcommand implementations.

pub mod extract;
