use std::process::ExitCode;

use anyhow::Context;
use dip::docker::{EngineQuery, SystemRunner};
use dip::error::EXIT_ENGINE;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cwd = match std::env::current_dir().context("cannot read the working directory") {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(EXIT_ENGINE as u8);
        }
    };

    let code = dip::cli::dispatch(std::env::args(), &SystemRunner, &EngineQuery, cwd).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
