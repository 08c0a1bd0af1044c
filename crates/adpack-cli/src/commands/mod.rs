//! Subcommand implementations.

pub mod completion;
pub mod ingest;
pub mod preview;
