mod cli_args;
mod repl;
mod repl_command;
mod snapshot_renderer;

pub use cli_args::CliArgs;
pub use repl::ChatRepl;
pub use repl_command::{HELP, ReplCommand};
pub use snapshot_renderer::SnapshotRenderer;
