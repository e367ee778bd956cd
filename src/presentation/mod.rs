pub mod cli;
pub mod config;

pub use cli::{ChatRepl, CliArgs};
pub use config::{Environment, ScaffoldConfig, Settings};
