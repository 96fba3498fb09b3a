//! Command-line front end for the stepwire client.
//!
//! Talks to a companion process on the local host and prints what it knows
//! about steps and specs. Useful for checking that a companion is up and
//! that a step resolves to the expected declaration pattern.

use std::io::{self, Write};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use stepwire_client::client::{StepClient, fetch_specs_from_port};
use stepwire_client::config::{ClientConfig, LogLevel};
use stepwire_client::connection::ConnectionConfig;
use stepwire_client::error::{ClientError, ConnectionError};
use stepwire_client::logging::init_logging;
use stepwire_client::resolver::PortRegistry;

/// Query a stepwire companion process.
#[derive(Parser, Debug)]
#[command(name = "stepwire", version, about)]
struct Args {
    /// Log level (trace, debug, info, warn, error, off).
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Port of the companion process.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Project name the companion is registered under.
    #[arg(long, global = true, default_value = "default")]
    project: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse step text and print its step value.
    StepValue {
        /// Step text as written in a spec.
        text: String,
    },
    /// List every step the companion knows about.
    Steps,
    /// List the specs that parsed successfully.
    Specs,
    /// Print the declaration search pattern for step text.
    Pattern {
        /// Step text as written in a spec, optionally ending in ` <table>`.
        text: String,
    },
}

fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ClientConfig::default());
            tracing::error!(error = %e, "invalid configuration");
            process::exit(2);
        }
    };
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "starting stepwire");

    if let Err(e) = run(&config, &args) {
        tracing::error!(error = %e, "command failed");
        let code = if matches!(e, ClientError::InvalidConfig(_)) { 2 } else { 1 };
        process::exit(code);
    }
}

fn build_config(args: &Args) -> Result<ClientConfig, ClientError> {
    let config = ClientConfig::from_env()?;
    Ok(config.apply_overrides(args.log_level, args.port))
}

fn run(config: &ClientConfig, args: &Args) -> Result<(), ClientError> {
    let port = config.api_port.ok_or_else(|| {
        ClientError::InvalidConfig("no companion port, pass --port or set STEPWIRE_API_PORT".into())
    })?;
    let connection_config = config.connection_config();

    let project = args.project.as_str();

    let lines: Vec<String> = match &args.command {
        Command::Specs => fetch_specs_from_port(port, &connection_config)?
            .into_iter()
            .map(|spec| format!("{}\t{}", spec.file_name, spec.spec_heading))
            .collect(),
        Command::StepValue { text } => project_client(project, port, connection_config)
            .fetch_step_value(project, text)?
            .map(|value| format!("{}\t{}", value.step_value, value.parameterized_step_value))
            .into_iter()
            .collect(),
        Command::Steps => project_client(project, port, connection_config)
            .fetch_all_steps(project)?
            .into_iter()
            .map(|value| value.step_value)
            .collect(),
        Command::Pattern { text } => {
            vec![project_client(project, port, connection_config).search_pattern(project, text)?]
        }
    };

    write_lines(&lines).map_err(ConnectionError::from)?;
    Ok(())
}

fn project_client(
    project: &str,
    port: u16,
    config: ConnectionConfig,
) -> StepClient<PortRegistry> {
    let mut registry = PortRegistry::new(config);
    registry.register(project, port);
    StepClient::new(registry)
}

fn write_lines(lines: &[String]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
