use std::error::Error;
use std::io;
use std::process::ExitCode;

use clap::ArgMatches;
use openapi_explorer::cli::{build_cli, resolve_config, run};
use openapi_explorer::error::CliError;
use openapi_explorer::telemetry;

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    match try_main(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn try_main(matches: &ArgMatches) -> Result<(), CliError> {
    let cfg = resolve_config(matches)?;
    telemetry::init(&cfg.logging)?;
    let mut stdout = io::stdout().lock();
    run(&cfg, matches, &mut stdout)
}
