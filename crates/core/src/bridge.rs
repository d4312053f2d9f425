//! Session request bridge.
//!
//! Owns the single in-flight session and mediates between the SDK's request
//! and the processor's asynchronous replies arriving over the blob channel.
//!
//! # States
//!
//! ```text
//!   Idle ──on_session_request──▶ AwaitingResponse ──ResponseReady──────▶ Terminal
//!    ▲                              │    ▲  │        CatastrophicError        │
//!    │                              │    └──┘ ProgressUpdate   cancel()       │
//!    │                              └── channel send failure ──────────────▶ │
//!    └──────────────────────────────── reset() ◀─────────────────────────────┘
//! ```
//!
//! Terminal is absorbing: only an explicit [`SessionBridge::reset`] returns to
//! Idle, so a stray late event from a finished session can never be
//! attributed to the next one.
//!
//! # Locking
//!
//! All state lives behind one mutex. Transitions are decided and committed
//! under the lock; the resulting SDK callback and the outbound channel send
//! run after the lock is released, so callbacks and channels may re-enter the
//! bridge.

use std::sync::Arc;

use parking_lot::Mutex;
use sessionbridge_protocol::{Blob, ClientMetadata, CorrelationId, Direction, ExternalReferenceId, ProcessorEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::callback::{CallbackHandle, SessionCallback};
use crate::channel::BlobChannel;
use crate::error::{Error, Result, Violation};

/// A session request issued by the SDK. Immutable once created.
#[derive(Debug, Clone)]
pub struct SessionRequest {
	pub correlation_id: CorrelationId,
	pub payload: Blob,
}

/// Externally observable bridge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Idle,
	AwaitingResponse,
	Terminal,
}

/// How the most recent session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
	/// The processor's response was delivered to the SDK.
	Responded,
	/// The processor reported a catastrophic error; the SDK was aborted.
	Aborted,
	/// `SessionOpened` never reached the processor; the SDK was aborted.
	ChannelFailed,
	/// The host cancelled the SDK session before a terminal event arrived.
	Cancelled,
}

struct ActiveSession {
	request: SessionRequest,
	handle: CallbackHandle,
	progress_events: u32,
}

struct FinishedSession {
	correlation_id: CorrelationId,
}

enum SessionState {
	Idle,
	AwaitingResponse(ActiveSession),
	Terminal(FinishedSession),
}

impl SessionState {
	fn phase(&self) -> SessionPhase {
		match self {
			Self::Idle => SessionPhase::Idle,
			Self::AwaitingResponse(_) => SessionPhase::AwaitingResponse,
			Self::Terminal(_) => SessionPhase::Terminal,
		}
	}
}

struct Inner {
	state: SessionState,
	external_reference: Option<ExternalReferenceId>,
	last_outcome: Option<SessionOutcome>,
}

impl Inner {
	/// Validates an inbound event against the current state and commits the
	/// resulting transition.
	fn accept(&mut self, event: ProcessorEvent) -> std::result::Result<Relay, Violation> {
		let kind = event.kind();
		if event.direction() == Direction::HostToProcessor {
			return Err(Violation::WrongDirection { event: kind });
		}

		let active = match &mut self.state {
			SessionState::Idle => return Err(Violation::NoActiveSession { event: kind }),
			SessionState::Terminal(_) => {
				return Err(Violation::AfterTerminal {
					event: kind,
					received: event.correlation_id().clone(),
				});
			}
			SessionState::AwaitingResponse(active) => active,
		};

		if active.request.correlation_id != *event.correlation_id() {
			return Err(Violation::CorrelationMismatch {
				event: kind,
				active: active.request.correlation_id.clone(),
				received: event.correlation_id().clone(),
			});
		}

		match event {
			ProcessorEvent::ProgressUpdate { fraction, .. } => {
				active.progress_events += 1;
				Ok(Relay::Progress(active.handle.clone(), fraction))
			}
			ProcessorEvent::ResponseReady { bytes, .. } => Ok(Relay::Response(self.finish(SessionOutcome::Responded), bytes)),
			ProcessorEvent::CatastrophicError { .. } => Ok(Relay::Abort(self.finish(SessionOutcome::Aborted))),
			ProcessorEvent::SessionOpened { .. } => Err(Violation::WrongDirection { event: kind }),
		}
	}

	/// Moves an active session to Terminal and hands back its handle.
	///
	/// Must only be called while AwaitingResponse.
	fn finish(&mut self, outcome: SessionOutcome) -> CallbackHandle {
		let SessionState::AwaitingResponse(active) = std::mem::replace(&mut self.state, SessionState::Idle) else {
			unreachable!("finish called outside AwaitingResponse");
		};

		info!(
			target = "sessionbridge.bridge",
			correlation_id = %active.request.correlation_id,
			?outcome,
			progress_events = active.progress_events,
			"session finished"
		);

		self.state = SessionState::Terminal(FinishedSession {
			correlation_id: active.request.correlation_id,
		});
		self.last_outcome = Some(outcome);
		active.handle
	}
}

/// SDK callback decided under the lock, performed after it is released.
enum Relay {
	Progress(CallbackHandle, f32),
	Response(CallbackHandle, Blob),
	Abort(CallbackHandle),
}

impl Relay {
	fn perform(self) -> Result<()> {
		match self {
			Self::Progress(handle, fraction) => {
				let forwarded = handle.report_progress(fraction)?;
				debug!(
					target = "sessionbridge.bridge",
					correlation_id = %handle.correlation_id(),
					fraction = forwarded,
					"progress relayed"
				);
				Ok(())
			}
			Self::Response(handle, bytes) => handle.deliver_response(bytes),
			Self::Abort(handle) => handle.abort(),
		}
	}
}

/// Bridge between the SDK's session requests and the blob channel.
///
/// One instance serves one session at a time. Share it behind an `Arc`
/// between the SDK adapter, the inbound [`run`](Self::run) loop, and the
/// [`SessionController`](crate::SessionController).
pub struct SessionBridge {
	channel: Arc<dyn BlobChannel>,
	client_metadata: ClientMetadata,
	inner: Mutex<Inner>,
}

impl SessionBridge {
	pub fn new(channel: Arc<dyn BlobChannel>, client_metadata: ClientMetadata) -> Self {
		Self {
			channel,
			client_metadata,
			inner: Mutex::new(Inner {
				state: SessionState::Idle,
				external_reference: None,
				last_outcome: None,
			}),
		}
	}

	/// Registers a session request from the SDK and forwards it to the processor.
	///
	/// Returns immediately; the response arrives later through `callback`.
	///
	/// # Errors
	///
	/// - [`Error::AlreadyActive`] if the bridge is not Idle. Nothing is mutated.
	/// - [`Error::Channel`] if `SessionOpened` could not be sent. The SDK has
	///   already been aborted and the bridge is Terminal.
	pub fn on_session_request(&self, correlation_id: CorrelationId, payload: Blob, callback: Arc<dyn SessionCallback>) -> Result<CallbackHandle> {
		let handle = CallbackHandle::new(correlation_id.clone(), callback);
		let payload_len = payload.len();
		let (opened, has_reference) = {
			let mut inner = self.inner.lock();

			match &inner.state {
				SessionState::Idle => {}
				SessionState::AwaitingResponse(active) => {
					return Err(Error::AlreadyActive {
						active: Some(active.request.correlation_id.clone()),
					});
				}
				SessionState::Terminal(finished) => {
					return Err(Error::AlreadyActive {
						active: Some(finished.correlation_id.clone()),
					});
				}
			}

			inner.state = SessionState::AwaitingResponse(ActiveSession {
				request: SessionRequest {
					correlation_id: correlation_id.clone(),
					payload: payload.clone(),
				},
				handle: handle.clone(),
				progress_events: 0,
			});

			let opened = ProcessorEvent::SessionOpened {
				correlation_id: correlation_id.clone(),
				payload,
				external_reference_id: inner.external_reference.clone(),
				client_metadata: self.client_metadata.clone(),
			};
			(opened, inner.external_reference.is_some())
		};

		// Sent unlocked: a channel may deliver replies inline through `dispatch`.
		match self.channel.send(opened) {
			Ok(()) => {
				info!(target = "sessionbridge.bridge", %correlation_id, payload_len, has_reference, "session opened");
				Ok(handle)
			}
			Err(err) => {
				error!(
					target = "sessionbridge.bridge",
					%correlation_id,
					error = %err,
					"failed to forward session request; aborting"
				);
				let failed = {
					let mut inner = self.inner.lock();
					let still_active = matches!(&inner.state, SessionState::AwaitingResponse(active) if active.request.correlation_id == correlation_id);
					still_active.then(|| inner.finish(SessionOutcome::ChannelFailed))
				};
				if let Some(handle) = failed {
					handle.abort()?;
				}
				Err(Error::Channel(err))
			}
		}
	}

	/// Processes one inbound event from the processor.
	///
	/// Protocol violations are logged and returned; they never change state
	/// and never reach the SDK.
	pub fn dispatch(&self, event: ProcessorEvent) -> Result<()> {
		let relay = self.inner.lock().accept(event);

		match relay {
			Ok(relay) => relay.perform().inspect_err(|err| {
				warn!(target = "sessionbridge.bridge", error = %err, "callback rejected");
			}),
			Err(violation) => {
				warn!(target = "sessionbridge.bridge", %violation, "discarding event");
				Err(violation.into())
			}
		}
	}

	/// Drains inbound events until the channel closes.
	///
	/// Events are dispatched one at a time in delivery order.
	pub async fn run(&self, mut inbound_rx: mpsc::UnboundedReceiver<ProcessorEvent>) {
		while let Some(event) = inbound_rx.recv().await {
			let _ = self.dispatch(event);
		}

		debug!(target = "sessionbridge.bridge", "inbound loop ended (channel closed)");
	}

	/// Host-level cancellation of the SDK session.
	///
	/// While AwaitingResponse the session becomes Terminal without calling
	/// `abort()`, since the SDK itself ended it. Returns whether a session was
	/// cancelled.
	pub fn cancel(&self) -> bool {
		let mut inner = self.inner.lock();
		if !matches!(inner.state, SessionState::AwaitingResponse(_)) {
			return false;
		}
		inner.finish(SessionOutcome::Cancelled).expire();
		true
	}

	/// Returns the bridge to Idle for the next session.
	///
	/// Resetting an active session expires its handle first. Returns the
	/// phase the bridge was in.
	pub fn reset(&self) -> SessionPhase {
		let mut inner = self.inner.lock();
		let previous = std::mem::replace(&mut inner.state, SessionState::Idle);
		let phase = previous.phase();

		if let SessionState::AwaitingResponse(active) = previous {
			active.handle.expire();
			warn!(
				target = "sessionbridge.bridge",
				correlation_id = %active.request.correlation_id,
				"reset while awaiting response; handle expired"
			);
		} else {
			debug!(target = "sessionbridge.bridge", from = ?phase, "bridge reset");
		}

		phase
	}

	/// Sets the reference forwarded with the next `SessionOpened`.
	pub fn arm_reference(&self, reference: Option<ExternalReferenceId>) {
		self.inner.lock().external_reference = reference;
	}

	pub fn external_reference(&self) -> Option<ExternalReferenceId> {
		self.inner.lock().external_reference.clone()
	}

	pub fn phase(&self) -> SessionPhase {
		self.inner.lock().state.phase()
	}

	/// Correlation id of the outstanding session, if any.
	pub fn active_correlation_id(&self) -> Option<CorrelationId> {
		match &self.inner.lock().state {
			SessionState::AwaitingResponse(active) => Some(active.request.correlation_id.clone()),
			_ => None,
		}
	}

	pub fn last_outcome(&self) -> Option<SessionOutcome> {
		self.inner.lock().last_outcome
	}
}
