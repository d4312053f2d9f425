//! Blob channel between the bridge and the network processor.
//!
//! The channel is the bridge's only view of the processor. Outbound it
//! carries `SessionOpened`; inbound it carries progress and terminal events.
//! Sends never block: the in-memory implementation enqueues onto an unbounded
//! tokio mpsc queue and the bridge drains the inbound side in its `run` loop.
//!
//! ```text
//!   SessionBridge ──send──▶ MpscChannel ──▶ ProcessorEndpoint ──▶ Processor
//!        ▲                                          │
//!        └──────── inbound_rx ◀──── EventSink ◀─────┘
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sessionbridge_protocol::{Blob, ClientMetadata, CorrelationId, ExternalReferenceId, ProcessorEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Outbound half of the blob channel, as seen by the bridge.
pub trait BlobChannel: Send + Sync {
	/// Hands `event` to the transport without waiting for delivery.
	fn send(&self, event: ProcessorEvent) -> Result<(), ChannelError>;
}

/// Session details handed to a [`Processor`], unpacked from `SessionOpened`.
#[derive(Debug, Clone)]
pub struct OpenedSession {
	pub correlation_id: CorrelationId,
	pub payload: Blob,
	pub external_reference_id: Option<ExternalReferenceId>,
	pub client_metadata: ClientMetadata,
}

impl OpenedSession {
	fn from_event(event: ProcessorEvent) -> Result<Self, ProcessorEvent> {
		match event {
			ProcessorEvent::SessionOpened {
				correlation_id,
				payload,
				external_reference_id,
				client_metadata,
			} => Ok(Self {
				correlation_id,
				payload,
				external_reference_id,
				client_metadata,
			}),
			other => Err(other),
		}
	}
}

/// Application networking code serving sessions on the far side of the channel.
///
/// A processor must emit zero or more progress updates followed by exactly
/// one terminal event through `sink`.
pub trait Processor: Send + Sync + 'static {
	fn process(self: Arc<Self>, session: OpenedSession, sink: EventSink) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// In-memory [`BlobChannel`] backed by a tokio unbounded queue.
#[derive(Clone)]
pub struct MpscChannel {
	outbound_tx: mpsc::UnboundedSender<ProcessorEvent>,
}

impl BlobChannel for MpscChannel {
	fn send(&self, event: ProcessorEvent) -> Result<(), ChannelError> {
		self.outbound_tx.send(event).map_err(|_| ChannelError::Closed)
	}
}

/// Both ends of an in-memory channel.
pub struct ChannelParts {
	/// Outbound half, handed to the bridge.
	pub channel: MpscChannel,
	/// Inbound events for [`SessionBridge::run`](crate::SessionBridge::run).
	pub inbound_rx: mpsc::UnboundedReceiver<ProcessorEvent>,
	/// Processor side.
	pub endpoint: ProcessorEndpoint,
}

/// Creates a connected in-memory channel.
pub fn pair() -> ChannelParts {
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
	let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

	ChannelParts {
		channel: MpscChannel { outbound_tx },
		inbound_rx,
		endpoint: ProcessorEndpoint {
			outbound_rx,
			sink: EventSink { inbound_tx },
		},
	}
}

/// Cloneable sender for processor-to-host events.
#[derive(Clone)]
pub struct EventSink {
	inbound_tx: mpsc::UnboundedSender<ProcessorEvent>,
}

impl EventSink {
	pub fn emit(&self, event: ProcessorEvent) -> Result<(), ChannelError> {
		self.inbound_tx.send(event).map_err(|_| ChannelError::Closed)
	}

	pub fn progress(&self, correlation_id: &CorrelationId, fraction: f32) -> Result<(), ChannelError> {
		self.emit(ProcessorEvent::ProgressUpdate {
			correlation_id: correlation_id.clone(),
			fraction,
		})
	}

	pub fn response(&self, correlation_id: &CorrelationId, bytes: Blob) -> Result<(), ChannelError> {
		self.emit(ProcessorEvent::ResponseReady {
			correlation_id: correlation_id.clone(),
			bytes,
		})
	}

	pub fn catastrophic(&self, correlation_id: &CorrelationId) -> Result<(), ChannelError> {
		self.emit(ProcessorEvent::CatastrophicError {
			correlation_id: correlation_id.clone(),
		})
	}
}

/// Processor side of an in-memory channel.
pub struct ProcessorEndpoint {
	outbound_rx: mpsc::UnboundedReceiver<ProcessorEvent>,
	sink: EventSink,
}

impl ProcessorEndpoint {
	/// Receives the next host-to-processor event.
	pub async fn recv(&mut self) -> Option<ProcessorEvent> {
		self.outbound_rx.recv().await
	}

	pub fn sink(&self) -> EventSink {
		self.sink.clone()
	}

	/// Serves every opened session with `processor` until the bridge side closes.
	///
	/// Each session runs on its own task so a slow webservice call never
	/// delays reading the next `SessionOpened`.
	pub async fn serve<P: Processor>(mut self, processor: Arc<P>) {
		while let Some(event) = self.outbound_rx.recv().await {
			match OpenedSession::from_event(event) {
				Ok(session) => {
					debug!(
						target = "sessionbridge.channel",
						correlation_id = %session.correlation_id,
						payload_len = session.payload.len(),
						"dispatching session to processor"
					);
					tokio::spawn(Arc::clone(&processor).process(session, self.sink.clone()));
				}
				Err(other) => {
					warn!(
						target = "sessionbridge.channel",
						event = other.kind(),
						correlation_id = %other.correlation_id(),
						"processor received a processor-to-host event; ignoring"
					);
				}
			}
		}

		debug!(target = "sessionbridge.channel", "processor endpoint closed");
	}
}
