//! Identifier newtypes carried on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-session correlation identifier.
///
/// Generated by the SDK side for every session request and echoed by the
/// processor on every reply, so late events from an earlier session can be
/// told apart from the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CorrelationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CorrelationId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for CorrelationId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Caller-supplied reference tying a session to an external record, such as
/// an enrollment stored by the webservice.
///
/// Meaningless to the bridge beyond being forwarded with `SessionOpened`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalReferenceId(String);

impl ExternalReferenceId {
	/// Wraps `id`, returning `None` for an empty string.
	pub fn new(id: impl Into<String>) -> Option<Self> {
		let id = id.into();
		(!id.is_empty()).then_some(Self(id))
	}

	/// Builds `<prefix><unique>`. `unique` must render non-empty.
	pub fn with_prefix(prefix: &str, unique: impl fmt::Display) -> Self {
		Self(format!("{prefix}{unique}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ExternalReferenceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
