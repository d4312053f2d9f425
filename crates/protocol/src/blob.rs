//! Opaque byte payloads.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque byte sequence produced by the SDK or the processor.
///
/// Serialized as standard base64. `Debug` and `Display` only report the
/// length so payloads never end up in logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}

	/// Decodes a standard base64 string.
	pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
		STANDARD.decode(encoded).map(Self)
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(&self.0)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Blob({} bytes)", self.0.len())
	}
}

impl fmt::Display for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<{} bytes>", self.0.len())
	}
}

impl From<Vec<u8>> for Blob {
	fn from(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}
}

impl From<&[u8]> for Blob {
	fn from(bytes: &[u8]) -> Self {
		Self(bytes.to_vec())
	}
}

impl Serialize for Blob {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for Blob {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		Self::from_base64(&encoded).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_hides_contents() {
		let blob = Blob::new(b"secret-face-scan".to_vec());
		assert_eq!(format!("{blob:?}"), "Blob(16 bytes)");
		assert_eq!(blob.to_string(), "<16 bytes>");
	}

	#[test]
	fn serializes_as_base64() {
		let blob = Blob::new(b"hi".to_vec());
		assert_eq!(serde_json::to_string(&blob).unwrap(), "\"aGk=\"");
	}

	#[test]
	fn rejects_invalid_base64() {
		let err = serde_json::from_str::<Blob>("\"not base64!\"");
		assert!(err.is_err());
	}
}
