use std::io;
use std::process::ExitCode;

use clap::Parser;
use multibin_demo::cli::{CliArgs, CliError, Dispatcher, TOOL_NAME};
use multibin_demo::{logging, BuildInfo};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let build = BuildInfo::from_build_env();

    if args.version {
        print!("{}", build.banner(TOOL_NAME));
        return ExitCode::SUCCESS;
    }

    if args.verbose {
        if let Err(e) = logging::init("debug") {
            eprintln!("Failed to initialize logging: {e}");
        }
        tracing::debug!("Starting CLI application...");
    }

    let dispatcher = Dispatcher::new(build, &args);
    let result = dispatcher.run(args.command.as_deref(), &mut io::stdout().lock());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ CliError::UnknownCommand(_)) => {
            println!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
