//! DSSSL CLI entry point.

use clap::Parser;
use dsssl_foundation::Result;
use dsssl_language::Options;
use dsssl_runtime::{Repl, init_logging, print_error};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "dsssl", version)]
#[command(about = "Evaluate DSSSL expression-language stylesheets")]
struct Cli {
    /// Stylesheet files to load, in order
    files: Vec<PathBuf>,

    /// Evaluate an expression and print its value (repeatable)
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    exprs: Vec<String>,

    /// Exit after loading files instead of starting the REPL
    #[arg(short, long)]
    batch: bool,

    /// Disable tail calls and report stack traces on errors
    #[arg(long)]
    debug: bool,

    /// Accept DSSSL2 extensions
    #[arg(long)]
    dsssl2: bool,

    /// Internal length units per inch
    #[arg(long, default_value_t = 72000, value_name = "N")]
    units_per_inch: i64,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` if any error diagnostic was reported.
fn run(cli: &Cli) -> Result<bool> {
    let options = Options {
        debug: cli.debug,
        dsssl2: cli.dsssl2,
        units_per_inch: cli.units_per_inch,
    };
    let mut repl = Repl::new(options)?;

    for file in &cli.files {
        repl.eval_file(file)?;
    }

    for expr in &cli.exprs {
        let value = repl.eval(expr)?;
        if !value.is_error() {
            println!("{}", repl.interpreter().print(&value));
        }
    }

    if !cli.batch && cli.exprs.is_empty() {
        // Files already establish context
        if !cli.files.is_empty() {
            repl = repl.without_banner();
        }
        repl.run()?;
    }

    Ok(repl.error_count() == 0)
}
