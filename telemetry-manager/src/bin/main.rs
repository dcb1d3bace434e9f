use clap::Parser;
use std::process::ExitCode;
use telemetry_manager::cli::{Cli, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // stderr, since logging is not set up when the config could not be loaded
            eprintln!("Operation failed: {err}");
            err.to_exit_code()
        }
    }
}
