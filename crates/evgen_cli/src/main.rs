//! evgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 5: IaC error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use evgen_iac::IacError;
use evgen_spec::SpecError;

mod commands;

use commands::{Cli, Commands, ValidationFailed};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const IAC_ERROR: u8 = 5;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "evgen=debug"
    } else if cli.quiet {
        "evgen=warn"
    } else {
        "evgen=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}", level)));

    let log_result = tracing_subscriber::registry()
        .with(
            cli.log_json
                .then(|| fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json)
                .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<ValidationFailed>().is_some() {
        return ExitCodes::VALIDATION_FAILURE;
    }

    if let Some(err) = e.downcast_ref::<IacError>() {
        return match err {
            IacError::Spec(spec) => categorize_spec_error(spec),
            IacError::EnvironmentNotFound(_)
            | IacError::NoServersDefined
            | IacError::InvalidBlueprint(_)
            | IacError::InvalidPolicy(_) => ExitCodes::VALIDATION_FAILURE,
            _ => ExitCodes::IAC_ERROR,
        };
    }

    if let Some(err) = e.downcast_ref::<SpecError>() {
        return categorize_spec_error(err);
    }

    ExitCodes::GENERAL_ERROR
}

fn categorize_spec_error(e: &SpecError) -> u8 {
    match e {
        SpecError::NotFound(_) => ExitCodes::INVALID_ARGS,
        SpecError::InvalidFormat { .. } | SpecError::Yaml(_) | SpecError::Json(_) => {
            ExitCodes::VALIDATION_FAILURE
        }
        SpecError::Io(_) => ExitCodes::GENERAL_ERROR,
    }
}
