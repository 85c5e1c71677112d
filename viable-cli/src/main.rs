mod error;

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process;

use clap::Parser;
use colored::Colorize;
use log::{debug, info};
use viable_core::{Diagnostics, compile, compile_debug, parse};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "viable")]
#[command(about = "Viable - a readable pattern language that compiles to regular expressions")]
#[command(version)]
pub struct Args {
    /// Read the program from a file instead of stdin
    #[arg(value_name = "INPUT_FILE")]
    input_file: Option<String>,

    /// Write the raw pattern to a file
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    output_file: Option<String>,

    /// Print output with no color
    #[arg(short = 'n', long = "no-color")]
    no_color: bool,

    /// Print the pattern without surrounding slashes or a trailing newline
    #[arg(short = 'c', long = "clean")]
    clean: bool,

    /// Print the parsed tree instead of compiling
    #[arg(long)]
    ast: bool,

    /// Print a compilation report to stderr
    #[arg(short, long)]
    debug: bool,
}

/// The program text and the name to show in diagnostics
struct Input {
    source: String,
    name: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(error) = run(&args) {
        error.report();
        process::exit(error.exit_code());
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let input = read_input(args)?;
    debug!("read {} bytes from {}", input.source.len(), input.name);

    if args.ast {
        return match parse(&input.source) {
            Ok(program) => {
                println!("{:#?}", program);
                Ok(())
            }
            Err(diagnostics) => Err(render_failure(args, &input, diagnostics)),
        };
    }

    let compiled = if args.debug {
        compile_debug(&input.source).map(|report| {
            eprintln!("{}", report);
            report.result
        })
    } else {
        compile(&input.source)
    };
    let result = match compiled {
        Ok(result) => result,
        Err(diagnostics) => return Err(render_failure(args, &input, diagnostics)),
    };

    if !result.warnings.is_empty() {
        eprintln!("{}", render(args, &input, &result.warnings));
    }

    if let Some(path) = &args.output_file {
        fs::write(path, &result.pattern).map_err(|source| CliError::WriteFile {
            path: path.clone(),
            source,
        })?;
        info!("wrote pattern to {}", path);
        return Ok(());
    }

    if args.clean {
        print!("{}", result.pattern);
    } else {
        println!("{}{}{}", "/".dimmed(), result.pattern.green(), "/".dimmed());
    }
    Ok(())
}

fn read_input(args: &Args) -> Result<Input, CliError> {
    if let Some(path) = &args.input_file {
        let source = fs::read_to_string(path).map_err(|source| CliError::ReadFile {
            path: path.clone(),
            source,
        })?;
        return Ok(Input {
            source,
            name: path.clone(),
        });
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::NoInput);
    }

    let mut source = String::new();
    stdin
        .read_to_string(&mut source)
        .map_err(CliError::ReadStdin)?;
    Ok(Input {
        source,
        name: "<stdin>".to_string(),
    })
}

fn render(args: &Args, input: &Input, diagnostics: &Diagnostics) -> String {
    diagnostics
        .printer()
        .source(&input.source)
        .path(&input.name)
        .colored(!args.no_color && io::stderr().is_terminal())
        .render()
}

fn render_failure(args: &Args, input: &Input, diagnostics: Diagnostics) -> CliError {
    eprintln!("{}", render(args, input, &diagnostics));
    CliError::Compile(diagnostics)
}
