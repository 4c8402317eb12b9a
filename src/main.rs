use clap::Parser;
use codeweave::{Cli, Output, WeaveError};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            Output::new(false, quiet).error(&format!("{err:#}"));
            let code = err.downcast_ref::<WeaveError>().map_or(1, WeaveError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
