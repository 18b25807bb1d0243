//! The `sqlsmith` host: connects a live MySQL-compatible schema to
//! [`sqlsmith_core`]'s grammar engine and drives the generate/execute loop.

pub mod cli;
pub mod dut;
pub mod error;
pub mod schema_loader;
pub mod stats;

pub use cli::Args;
pub use error::HostError;
