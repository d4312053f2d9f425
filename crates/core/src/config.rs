//! Bridge and processor configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! none at all) is valid.
//!
//! ```json
//! {
//!   "endpoint": "https://example.com/api/process-request",
//!   "device_key_identifier": "dk_123",
//!   "max_retries": 2
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sessionbridge_protocol::ClientMetadata;

use crate::error::{Error, Result};
use crate::lifecycle::ReferenceGenerator;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/process-request";
pub const DEFAULT_REFERENCE_PREFIX: &str = "sessionbridge_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	/// Webservice URL the processor posts session requests to.
	pub endpoint: String,
	pub device_key_identifier: Option<String>,
	/// Agent string forwarded with every session.
	pub user_agent: String,
	/// Upper bound for one webservice call, retries excluded.
	pub request_timeout_secs: u64,
	/// Extra attempts after a transport error.
	pub max_retries: u32,
	pub retry_delay_ms: u64,
	/// Request body chunk size; one progress update is emitted per chunk.
	pub upload_chunk_size: usize,
	/// Prefix of generated external references.
	pub reference_prefix: String,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.to_string(),
			device_key_identifier: None,
			user_agent: concat!("sessionbridge/", env!("CARGO_PKG_VERSION")).to_string(),
			request_timeout_secs: 120,
			max_retries: 2,
			retry_delay_ms: 500,
			upload_chunk_size: 16 * 1024,
			reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
		}
	}
}

impl BridgeConfig {
	/// Reads and validates a JSON config file.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&raw)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
			return Err(Error::Config(format!("endpoint must be an http(s) URL, got {:?}", self.endpoint)));
		}
		if self.upload_chunk_size == 0 {
			return Err(Error::Config("upload_chunk_size must be greater than zero".to_string()));
		}
		if self.request_timeout_secs == 0 {
			return Err(Error::Config("request_timeout_secs must be greater than zero".to_string()));
		}
		if self.reference_prefix.is_empty() {
			return Err(Error::Config("reference_prefix must not be empty".to_string()));
		}
		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}

	pub fn client_metadata(&self) -> ClientMetadata {
		ClientMetadata {
			user_agent: self.user_agent.clone(),
			device_key_identifier: self.device_key_identifier.clone(),
		}
	}

	pub fn reference_generator(&self) -> ReferenceGenerator {
		ReferenceGenerator::new(self.reference_prefix.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn partial_file_keeps_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{"endpoint": "https://example.com/process", "max_retries": 5}}"#).unwrap();

		let config = BridgeConfig::load(file.path()).unwrap();
		assert_eq!(config.endpoint, "https://example.com/process");
		assert_eq!(config.max_retries, 5);
		assert_eq!(config.request_timeout(), Duration::from_secs(120));
		assert_eq!(config.retry_delay(), Duration::from_millis(500));
		assert_eq!(config.reference_prefix, DEFAULT_REFERENCE_PREFIX);
	}

	#[test]
	fn invalid_endpoint_is_rejected() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{"endpoint": "ftp://example.com"}}"#).unwrap();

		assert!(matches!(BridgeConfig::load(file.path()), Err(Error::Config(_))));
	}

	#[test]
	fn zero_chunk_size_is_rejected() {
		let config = BridgeConfig {
			upload_chunk_size: 0,
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn missing_file_is_io_error() {
		let err = BridgeConfig::load(Path::new("/nonexistent/sessionbridge.json")).unwrap_err();
		assert!(matches!(err, Error::Io(_)));
	}

	#[test]
	fn metadata_carries_device_key() {
		let config = BridgeConfig {
			device_key_identifier: Some("dk_1".to_string()),
			..Default::default()
		};
		let metadata = config.client_metadata();
		assert_eq!(metadata.device_key_identifier.as_deref(), Some("dk_1"));
		assert!(metadata.user_agent.starts_with("sessionbridge/"));
	}
}
