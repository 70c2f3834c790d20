//! Command dispatch for the `cli` binary.
//!
//! Every command writes to an injected writer so the output can be checked
//! without spawning the binary.

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use thiserror::Error;

use crate::build_info::BuildInfo;

/// Tool name printed by `--version` and the usage banner
pub const TOOL_NAME: &str = "Example CLI Tool";

/// Simulated work time for `process`
pub const PROCESS_DELAY: Duration = Duration::from_millis(500);

/// Command line arguments for the `cli` binary
#[derive(Parser, Debug, Default)]
#[command(name = "cli")]
#[command(about = "Example CLI Tool - Multi-binary demo")]
#[command(disable_version_flag = true)]
pub struct CliArgs {
    /// Show version information
    #[arg(long)]
    pub version: bool,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Command to run (process, status, help)
    pub command: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Commands understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Process,
    Status,
    Help,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(Command::Process),
            "status" => Ok(Command::Status),
            "help" => Ok(Command::Help),
            other => Err(CliError::UnknownCommand(other.to_string())),
        }
    }
}

/// Runs one command against an output writer.
pub struct Dispatcher {
    build: BuildInfo,
    config: Option<PathBuf>,
    verbose: bool,
    process_delay: Duration,
}

impl Dispatcher {
    pub fn new(build: BuildInfo, args: &CliArgs) -> Self {
        Self {
            build,
            config: args.config.clone(),
            verbose: args.verbose,
            process_delay: PROCESS_DELAY,
        }
    }

    /// Override the simulated `process` work time.
    pub fn with_process_delay(mut self, delay: Duration) -> Self {
        self.process_delay = delay;
        self
    }

    /// Dispatch `command`, or print the usage banner when there is none.
    pub fn run<W: Write>(&self, command: Option<&str>, out: &mut W) -> Result<(), CliError> {
        let Some(command) = command else {
            write_usage(out)?;
            return Ok(());
        };

        match command.parse::<Command>()? {
            Command::Process => self.process(out),
            Command::Status => self.status(out),
            Command::Help => {
                writeln!(out, "Available commands: process, status, help")?;
                Ok(())
            }
        }
    }

    fn process<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        if self.verbose {
            let config = self
                .config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            tracing::debug!("Processing with config: {}", config);
        }

        writeln!(out, "Processing data...")?;
        out.flush()?;
        std::thread::sleep(self.process_delay);
        writeln!(out, "✅ Processing complete")?;
        Ok(())
    }

    fn status<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        if self.verbose {
            tracing::debug!("Checking system status...");
        }

        writeln!(out, "CLI Status: Running")?;
        writeln!(out, "Version: {}", self.build.version)?;
        writeln!(
            out,
            "Uptime: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(())
    }
}

/// Usage banner printed when no command is given
pub fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{} - Multi-binary demo", TOOL_NAME)?;
    writeln!(out, "Usage: cli [options] <command>")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  process    Process data")?;
    writeln!(out, "  status     Show status")?;
    writeln!(out, "  help       Show this help")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(BuildInfo::new("1.0.0", "abc", "today"), &CliArgs::default())
            .with_process_delay(Duration::ZERO)
    }

    fn run(command: Option<&str>) -> (Result<(), CliError>, String) {
        let mut out = Vec::new();
        let result = dispatcher().run(command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_no_command_prints_usage() {
        let (result, output) = run(None);
        assert!(result.is_ok());
        assert_eq!(
            output,
            "Example CLI Tool - Multi-binary demo\n\
             Usage: cli [options] <command>\n\
             \n\
             Commands:\n\
             \x20 process    Process data\n\
             \x20 status     Show status\n\
             \x20 help       Show this help\n"
        );
    }

    #[test]
    fn test_process() {
        let (result, output) = run(Some("process"));
        assert!(result.is_ok());
        assert_eq!(output, "Processing data...\n✅ Processing complete\n");
    }

    #[test]
    fn test_status() {
        let (result, output) = run(Some("status"));
        assert!(result.is_ok());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "CLI Status: Running");
        assert_eq!(lines[1], "Version: 1.0.0");
        let stamp = lines[2].strip_prefix("Uptime: ").unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn test_help() {
        let (result, output) = run(Some("help"));
        assert!(result.is_ok());
        assert_eq!(output, "Available commands: process, status, help\n");
    }

    #[test]
    fn test_unknown_command() {
        let (result, output) = run(Some("badcmd"));
        let err = result.unwrap_err();
        assert!(matches!(err, CliError::UnknownCommand(ref cmd) if cmd == "badcmd"));
        assert_eq!(err.to_string(), "Unknown command: badcmd");
        assert!(output.is_empty());
    }

    #[test]
    fn test_parse_flags() {
        let args =
            CliArgs::try_parse_from(["cli", "--verbose", "--config", "app.toml", "status"]).unwrap();
        assert!(args.verbose);
        assert!(!args.version);
        assert_eq!(args.config, Some(PathBuf::from("app.toml")));
        assert_eq!(args.command.as_deref(), Some("status"));
    }

    #[test]
    fn test_parse_version_flag() {
        let args = CliArgs::try_parse_from(["cli", "--version"]).unwrap();
        assert!(args.version);
        assert_eq!(args.command, None);
    }
}
