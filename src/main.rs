use std::process::ExitCode;

use clap::Parser;
use multibin_demo::config::{ServerArgs, ServerConfig};
use multibin_demo::lifecycle::{self, SHUTDOWN_DEADLINE};
use multibin_demo::shutdown::shutdown_signal;
use multibin_demo::{logging, BuildInfo};

const TOOL_NAME: &str = "Example Server";

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    let build = BuildInfo::from_build_env();

    if args.version {
        print!("{}", build.banner(TOOL_NAME));
        return ExitCode::SUCCESS;
    }

    // Load configuration from CLI args, environment variables, and config file
    let config = match ServerConfig::load_from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_level) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = build.version,
        commit = build.commit,
        address = %config.bind_addr(),
        "Starting {}",
        TOOL_NAME
    );

    match lifecycle::run(&config, build, shutdown_signal(), SHUTDOWN_DEADLINE).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server terminated");
            ExitCode::FAILURE
        }
    }
}
