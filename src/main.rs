//! `homelink` command-line entry point.
use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory as _, Parser as _};

use homelink::cli::{Cli, Command};
use homelink::commands;
use homelink::error::HomelinkError;
use homelink::logging::{self, Log, Logger};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match args.command {
        Command::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "homelink",
                &mut std::io::stdout().lock(),
            );
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            let _ = writeln!(std::io::stdout().lock(), "homelink {}", commands::version());
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let name = args.command.log_name();
    logging::init_subscriber(args.verbose, name);
    let logger = Logger::new(name);
    let log_path = logger.log_path().map(std::path::Path::to_path_buf);
    let log: Arc<dyn Log> = Arc::new(logger);

    match run(&args, &log) {
        Ok(()) => {
            if let Some(path) = log_path {
                log.debug(&format!("log written to {}", path.display()));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: &Cli, log: &Arc<dyn Log>) -> Result<()> {
    match &args.command {
        Command::Apply(opts) => commands::apply::run(&args.global, opts, log).map(drop),
        Command::Show(opts) => commands::show::run(&args.global, opts, log.as_ref()),
        Command::Unlink => commands::unlink::run(&args.global, log).map(drop),
        Command::Completions { .. } | Command::Version => Ok(()),
    }
}

/// Configuration errors exit with their own status; anything else is 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<HomelinkError>()
        .map_or(1, HomelinkError::exit_code)
}
