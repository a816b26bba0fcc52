pub mod cdp;
pub mod check;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod tools;

/// The clap command tree, for man page and completion generation.
#[must_use]
pub fn command() -> clap::Command {
    <cli::Cli as clap::CommandFactory>::command()
}
