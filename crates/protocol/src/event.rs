//! Events carried by the blob channel.

use serde::{Deserialize, Serialize};

use crate::blob::Blob;
use crate::ids::{CorrelationId, ExternalReferenceId};

/// Client identification forwarded to the processor with every session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientMetadata {
	/// Agent string identifying the SDK build, sent as a request header.
	pub user_agent: String,
	/// Device key identifier issued for this application.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_key_identifier: Option<String>,
}

/// Which side of the channel an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Bridge to processor.
	HostToProcessor,
	/// Processor to bridge.
	ProcessorToHost,
}

/// Discriminated union of every message crossing the blob channel.
///
/// Format on the wire:
/// ```json
/// { "type": "progress_update", "correlation_id": "s-1", "fraction": 0.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorEvent {
	/// Sent once per session, host to processor.
	SessionOpened {
		correlation_id: CorrelationId,
		payload: Blob,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		external_reference_id: Option<ExternalReferenceId>,
		client_metadata: ClientMetadata,
	},
	/// Upload/processing progress, processor to host, zero or more times.
	ProgressUpdate { correlation_id: CorrelationId, fraction: f32 },
	/// Terminal success, processor to host.
	ResponseReady { correlation_id: CorrelationId, bytes: Blob },
	/// Terminal failure, processor to host.
	CatastrophicError { correlation_id: CorrelationId },
}

impl ProcessorEvent {
	/// Session this event belongs to.
	pub fn correlation_id(&self) -> &CorrelationId {
		match self {
			Self::SessionOpened { correlation_id, .. }
			| Self::ProgressUpdate { correlation_id, .. }
			| Self::ResponseReady { correlation_id, .. }
			| Self::CatastrophicError { correlation_id } => correlation_id,
		}
	}

	pub fn direction(&self) -> Direction {
		match self {
			Self::SessionOpened { .. } => Direction::HostToProcessor,
			_ => Direction::ProcessorToHost,
		}
	}

	/// Whether this event ends a session.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::ResponseReady { .. } | Self::CatastrophicError { .. })
	}

	/// Short name for log fields.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::SessionOpened { .. } => "session_opened",
			Self::ProgressUpdate { .. } => "progress_update",
			Self::ResponseReady { .. } => "response_ready",
			Self::CatastrophicError { .. } => "catastrophic_error",
		}
	}
}
