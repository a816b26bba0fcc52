use clap::{CommandFactory, Parser};
use rmcp::ServiceExt;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use dia_browser_control::cdp::CdpExecutor;
use dia_browser_control::check::{format_report, run_check};
use dia_browser_control::cli::{CheckArgs, Cli, Command, ConfigArgs, ConfigCommand};
use dia_browser_control::config::{ResolvedConfig, init_config, load_config, resolve_config};
use dia_browser_control::dispatch::Dispatcher;
use dia_browser_control::error::AppError;
use dia_browser_control::mcp::McpServer;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "DIA_CONTROL_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.print_json_stderr();
        std::process::exit(i32::from(e.code as u8));
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let loaded = load_config(cli.global.config.as_deref());
    let overrides = cli.global.overrides(std::env::var(LOG_ENV).ok());
    let resolved = resolve_config(&loaded.file, loaded.path.clone(), &overrides);

    init_tracing(&resolved.log.level);
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => execute_serve(&resolved).await,
        Command::Check(args) => execute_check(&resolved, &args).await,
        Command::Config(args) => execute_config(&resolved, &args),
        Command::Completions(args) => {
            clap_complete::generate(
                args.shell,
                &mut Cli::command(),
                "dia-browser-control",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_dispatcher(resolved: &ResolvedConfig) -> Result<Dispatcher, AppError> {
    let executor = CdpExecutor::new(resolved.cdp_config())?;
    Ok(Dispatcher::new(executor, resolved.remediation()))
}

async fn execute_serve(resolved: &ResolvedConfig) -> Result<(), AppError> {
    let server = McpServer::new(build_dispatcher(resolved)?);
    tracing::info!(
        endpoint = %server.dispatcher().executor().config().endpoint(),
        "MCP server waiting for a client on stdio"
    );

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| AppError::general(format!("MCP handshake failed: {e}")))?;
    let cancel = service.cancellation_token();
    tokio::select! {
        quit = service.waiting() => {
            let reason = quit
                .map_err(|e| AppError::general(format!("MCP server task failed: {e}")))?;
            tracing::info!(?reason, "MCP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping server");
            cancel.cancel();
        }
    }
    Ok(())
}

async fn execute_check(resolved: &ResolvedConfig, args: &CheckArgs) -> Result<(), AppError> {
    let dispatcher = build_dispatcher(resolved)?;
    let report = run_check(&dispatcher).await?;
    if args.json {
        print_json(&report)
    } else {
        print!("{}", format_report(&report));
        Ok(())
    }
}

fn execute_config(resolved: &ResolvedConfig, args: &ConfigArgs) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => print_json(resolved),
        ConfigCommand::Init(init) => {
            let path = init_config(init.path.as_deref())?;
            print_json(&serde_json::json!({ "created": path.display().to_string() }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::general(format!("serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}
