mod kinds;
mod run;

use std::path::Path;

use anyhow::{Context, Result, bail};
use sessionbridge::BridgeConfig;
use sessionbridge_protocol::Blob;

use crate::cli::{Cli, Commands};

pub use run::OutputEvent;

/// Runs the parsed command. `Ok(false)` means the command ran but the
/// session did not complete.
pub async fn dispatch(cli: Cli) -> Result<bool> {
	match cli.command {
		Commands::Kinds => {
			kinds::print_kinds()?;
			Ok(true)
		}
		Commands::Run {
			tag,
			payload,
			payload_file,
			reference,
		} => {
			let config = load_config(cli.config.as_deref(), cli.endpoint, cli.device_key)?;
			let payload = match (payload, payload_file) {
				(Some(text), _) => Blob::new(text.into_bytes()),
				(None, Some(path)) => Blob::new(std::fs::read(&path).with_context(|| format!("failed to read payload from {}", path.display()))?),
				(None, None) => bail!("either --payload or --payload-file is required"),
			};
			run::run_session(&config, &tag, payload, reference).await
		}
	}
}

fn load_config(path: Option<&Path>, endpoint: Option<String>, device_key: Option<String>) -> Result<BridgeConfig> {
	let mut config = match path {
		Some(path) => BridgeConfig::load(path).with_context(|| format!("failed to load config from {}", path.display()))?,
		None => BridgeConfig::default(),
	};
	if let Some(endpoint) = endpoint {
		config.endpoint = endpoint;
	}
	if let Some(device_key) = device_key {
		config.device_key_identifier = Some(device_key);
	}
	config.validate()?;
	Ok(config)
}
