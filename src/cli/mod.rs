#![allow(clippy::doc_markdown)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "dia-browser-control",
    version,
    about = "MCP server that controls a Chromium-based browser over the DevTools Protocol",
    long_about = "dia-browser-control exposes browser control as Model Context Protocol tools. \
        It reads JSON-RPC requests on stdin and writes responses on stdout, translating each \
        tool call into Chrome DevTools Protocol requests against a browser started with \
        --remote-debugging-port.\n\n\
        Browser-level operations (listing, opening, closing and activating tabs) use the \
        browser's HTTP endpoint. Page-level operations (navigation, reload, history, \
        JavaScript) open a short-lived WebSocket to the target tab. Logs go to stderr.",
    after_long_help = "\
QUICK START:
  # Start the browser with remote debugging enabled
  /Applications/Dia.app/Contents/MacOS/Dia --remote-debugging-port=9222

  # Verify the endpoint is reachable
  dia-browser-control check

  # Run the MCP server (what an MCP host launches)
  dia-browser-control serve

EXIT CODES:
  0  Success
  1  General error (invalid arguments, config failure)
  2  Connection error (browser not running or debugging disabled)
  3  Target error (tab not found, no page open)
  4  Timeout error (no response within the command timeout)
  5  Protocol error (the browser rejected a command)

ENVIRONMENT VARIABLES:
  DIA_CONTROL_HOST     Debugging host (default: 127.0.0.1)
  DIA_CONTROL_PORT     Debugging port (default: 9222)
  DIA_CONTROL_TIMEOUT  WebSocket command timeout in milliseconds (default: 10000)
  DIA_CONTROL_CONFIG   Path to configuration file
  DIA_CONTROL_LOG      Log filter, e.g. debug or dia_browser_control=trace",
    term_width = 100
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Remote debugging host [default: 127.0.0.1]
    #[arg(long, global = true, env = "DIA_CONTROL_HOST")]
    pub host: Option<String>,

    /// Remote debugging port [default: 9222]
    #[arg(long, global = true, env = "DIA_CONTROL_PORT")]
    pub port: Option<u16>,

    /// WebSocket command timeout in milliseconds [default: 10000]
    #[arg(long, global = true, env = "DIA_CONTROL_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Log level or filter directive (overrides DIA_CONTROL_LOG and the config file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to configuration file (overrides default search)
    #[arg(long, global = true, env = "DIA_CONTROL_CONFIG")]
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    /// Flag and environment values that take precedence over the config file.
    #[must_use]
    pub fn overrides(&self, env_log: Option<String>) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            command_timeout_ms: self.timeout,
            log_level: self.log_level.clone().or(env_log),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP server on stdin/stdout
    #[command(
        long_about = "Run the Model Context Protocol server. Requests are read one per line \
            from stdin and answered one per line on stdout. The server stops when stdin \
            closes or on Ctrl-C.",
        after_long_help = "\
EXAMPLES:
  # Serve against the default endpoint
  dia-browser-control serve

  # Serve against a browser debugging on another port
  dia-browser-control --port 9333 serve"
    )]
    Serve,

    /// Check that the browser's debugging endpoint is reachable
    #[command(
        long_about = "Query the browser's version and target list and print a short report: \
            browser name, user agent, browser WebSocket URL, and the open page tabs. Exits \
            with the connection error code and prints remediation steps when the browser \
            cannot be reached.",
        after_long_help = "\
EXAMPLES:
  # Human-readable report
  dia-browser-control check

  # Machine-readable report
  dia-browser-control check --json"
    )]
    Check(CheckArgs),

    /// Configuration file management (show, init)
    #[command(
        long_about = "Show the resolved configuration or create a default config file. Config \
            files use TOML format and are searched in priority order: --config flag, \
            $DIA_CONTROL_CONFIG, ./.dia-control.toml, the platform config directory, and \
            ~/.dia-control.toml.",
        after_long_help = "\
EXAMPLES:
  # Show the resolved configuration
  dia-browser-control config show

  # Create a default config file
  dia-browser-control config init

  # Create a config at a custom path
  dia-browser-control config init --path ./dia-control.toml"
    )]
    Config(ConfigArgs),

    /// Generate shell completion scripts
    #[command(after_long_help = "\
EXAMPLES:
  dia-browser-control completions bash > /etc/bash_completion.d/dia-browser-control
  dia-browser-control completions zsh > ~/.zfunc/_dia-browser-control
  dia-browser-control completions fish > ~/.config/fish/completions/dia-browser-control.fish")]
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the resolved configuration as JSON
    Show,

    /// Create a default config file with commented example values
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the file [default: <config_dir>/dia-control/config.toml]
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
    pub shell: Shell,
}
