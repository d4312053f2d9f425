//! Error types for the session bridge.

use sessionbridge_protocol::CorrelationId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// A session was requested while another one is outstanding.
	///
	/// `active` is absent when the SDK has been started but has not issued
	/// its session request yet.
	#[error("a session is already outstanding")]
	AlreadyActive { active: Option<CorrelationId> },

	/// A callback operation was invoked through an expired handle.
	#[error("callback handle for session {correlation_id} is no longer valid")]
	InvalidHandle { correlation_id: CorrelationId },

	/// `SessionOpened` could not be handed to the blob channel.
	#[error("blob channel error: {0}")]
	Channel(#[from] ChannelError),

	/// An event arrived for the wrong state, session, or direction.
	#[error("protocol violation: {0}")]
	ProtocolViolation(Violation),

	/// A verification session was requested without a prior enrollment.
	#[error("no external reference available; complete an enrollment first")]
	MissingReference,

	#[error("unknown session kind: {0}")]
	UnknownSessionKind(String),

	/// The SDK refused to start a session.
	#[error("SDK unavailable: {0}")]
	SdkUnavailable(String),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn is_protocol_violation(&self) -> bool {
		matches!(self, Self::ProtocolViolation(_))
	}
}

/// Failures of the blob channel transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
	/// The other end of the channel has gone away.
	#[error("channel closed")]
	Closed,
	#[error("transport unavailable: {0}")]
	Unavailable(String),
}

/// Reason an inbound event was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
	#[error("{event} received while no session is active")]
	NoActiveSession { event: &'static str },

	#[error("{event} for session {received} received after the session finished")]
	AfterTerminal { event: &'static str, received: CorrelationId },

	#[error("{event} for session {received} does not match active session {active}")]
	CorrelationMismatch {
		event: &'static str,
		active: CorrelationId,
		received: CorrelationId,
	},

	#[error("{event} is a host-to-processor event and cannot be received")]
	WrongDirection { event: &'static str },
}

impl From<Violation> for Error {
	fn from(violation: Violation) -> Self {
		Self::ProtocolViolation(violation)
	}
}
