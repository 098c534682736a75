//! Command line interface for the `ewf` binary

pub mod args;
pub mod scenario;

pub use args::{Cli, Commands};
pub use scenario::Scenario;
