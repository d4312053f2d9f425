use std::process::ExitCode;

use clap::Parser;
use sessionbridge_cli::{cli::Cli, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match commands::dispatch(cli).await {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::FAILURE,
		Err(err) => {
			error!(target = "sbridge", error = %err, "command failed");
			ExitCode::FAILURE
		}
	}
}
