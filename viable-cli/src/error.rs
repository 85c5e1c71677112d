use std::error::Error as StdError;
use std::io;

use clap::CommandFactory;
use colored::Colorize;
use thiserror::Error;
use viable_core::Diagnostics;

use crate::Args;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("unable to read file at path {path}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to write file at path {path}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to read stdin")]
    ReadStdin(#[source] io::Error),

    #[error("no input file supplied and no input piped\nTry adding a path argument: 'viable ./pattern.viable'")]
    NoInput,

    /// Diagnostics have already been rendered when this is returned
    #[error("could not compile ({0})")]
    Compile(Diagnostics),
}

impl CliError {
    pub fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            CliError::ReadFile { .. } | CliError::WriteFile { .. } | CliError::ReadStdin(_) => {
                exitcode::IOERR
            }
            CliError::NoInput => exitcode::NOINPUT,
            CliError::Compile(_) => exitcode::DATAERR,
        }
    }

    pub fn report(&self) {
        match self {
            CliError::NoInput => {
                eprintln!("{} {}", "Info:".cyan().bold(), self);
                eprintln!();
                // already on an error path, a failure to print help changes nothing
                let _ = Args::command().print_help();
            }
            _ => {
                eprintln!("{} {}", "Error:".red().bold(), self);
                let mut source = StdError::source(self);
                while let Some(cause) = source {
                    eprintln!("  {} {}", "Cause:".bold(), cause);
                    source = cause.source();
                }
            }
        }
    }
}
