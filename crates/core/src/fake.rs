//! In-memory doubles for exercising the bridge without an SDK or a network.
//!
//! # Example
//!
//! ```ignore
//! let (channel, controller) = FakeChannelBuilder::new().build();
//! let bridge = Arc::new(SessionBridge::new(Arc::new(channel), ClientMetadata::default()));
//!
//! tokio::spawn({
//!     let bridge = Arc::clone(&bridge);
//!     let inbound = controller.take_inbound().unwrap();
//!     async move { bridge.run(inbound).await }
//! });
//!
//! let recorder = Arc::new(RecordingCallback::default());
//! bridge.on_session_request("s-1".into(), Blob::new(b"req".to_vec()), recorder.clone())?;
//! controller.inject_response("s-1", b"res");
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use sessionbridge_protocol::{Blob, CorrelationId, ProcessorEvent};
use tokio::sync::mpsc;

use crate::callback::SessionCallback;
use crate::channel::BlobChannel;
use crate::error::{ChannelError, Error, Result};
use crate::lifecycle::{SdkDriver, SdkEntryPoint};

/// Builder for fake channel instances.
pub struct FakeChannelBuilder {
	fail_with: Option<ChannelError>,
}

impl FakeChannelBuilder {
	pub fn new() -> Self {
		Self { fail_with: None }
	}

	/// Makes every send fail with `error` from the start.
	pub fn failing(mut self, error: ChannelError) -> Self {
		self.fail_with = Some(error);
		self
	}

	/// Builds the channel handed to the bridge and a controller for the test.
	pub fn build(self) -> (FakeChannel, FakeChannelController) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let shared = Arc::new(Mutex::new(FakeState {
			sent: Vec::new(),
			fail_with: self.fail_with,
		}));

		let channel = FakeChannel {
			shared: Arc::clone(&shared),
		};
		let controller = FakeChannelController {
			shared,
			inbound_tx,
			inbound_rx: Mutex::new(Some(inbound_rx)),
		};
		(channel, controller)
	}
}

impl Default for FakeChannelBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct FakeState {
	sent: Vec<ProcessorEvent>,
	fail_with: Option<ChannelError>,
}

/// [`BlobChannel`] that records outbound events.
pub struct FakeChannel {
	shared: Arc<Mutex<FakeState>>,
}

impl BlobChannel for FakeChannel {
	fn send(&self, event: ProcessorEvent) -> std::result::Result<(), ChannelError> {
		let mut state = self.shared.lock();
		if let Some(err) = &state.fail_with {
			return Err(err.clone());
		}
		state.sent.push(event);
		Ok(())
	}
}

/// Test-side controller for a [`FakeChannel`].
pub struct FakeChannelController {
	shared: Arc<Mutex<FakeState>>,
	inbound_tx: mpsc::UnboundedSender<ProcessorEvent>,
	inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<ProcessorEvent>>>,
}

impl FakeChannelController {
	/// Takes all events sent so far, clearing the buffer.
	pub fn take_sent(&self) -> Vec<ProcessorEvent> {
		std::mem::take(&mut self.shared.lock().sent)
	}

	/// Makes subsequent sends fail.
	pub fn fail_sends(&self, error: ChannelError) {
		self.shared.lock().fail_with = Some(error);
	}

	pub fn restore_sends(&self) {
		self.shared.lock().fail_with = None;
	}

	/// Receiver to hand to [`SessionBridge::run`](crate::SessionBridge::run). Only available once.
	pub fn take_inbound(&self) -> Option<mpsc::UnboundedReceiver<ProcessorEvent>> {
		self.inbound_rx.lock().take()
	}

	/// Queues an inbound event as if the processor had sent it.
	pub fn inject(&self, event: ProcessorEvent) {
		let _ = self.inbound_tx.send(event);
	}

	pub fn inject_progress(&self, correlation_id: &str, fraction: f32) {
		self.inject(ProcessorEvent::ProgressUpdate {
			correlation_id: CorrelationId::new(correlation_id),
			fraction,
		});
	}

	pub fn inject_response(&self, correlation_id: &str, bytes: &[u8]) {
		self.inject(ProcessorEvent::ResponseReady {
			correlation_id: CorrelationId::new(correlation_id),
			bytes: Blob::from(bytes),
		});
	}

	pub fn inject_catastrophic(&self, correlation_id: &str) {
		self.inject(ProcessorEvent::CatastrophicError {
			correlation_id: CorrelationId::new(correlation_id),
		});
	}
}

/// A call observed by [`RecordingCallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackCall {
	Response(Blob),
	Progress(f32),
	Abort,
}

/// [`SessionCallback`] that records every call in order.
#[derive(Default)]
pub struct RecordingCallback {
	calls: Mutex<Vec<CallbackCall>>,
}

impl RecordingCallback {
	pub fn calls(&self) -> Vec<CallbackCall> {
		self.calls.lock().clone()
	}

	pub fn abort_count(&self) -> usize {
		self.calls.lock().iter().filter(|call| **call == CallbackCall::Abort).count()
	}

	pub fn responses(&self) -> Vec<Blob> {
		self.calls
			.lock()
			.iter()
			.filter_map(|call| match call {
				CallbackCall::Response(blob) => Some(blob.clone()),
				_ => None,
			})
			.collect()
	}
}

impl SessionCallback for RecordingCallback {
	fn deliver_response(&self, response: Blob) {
		self.calls.lock().push(CallbackCall::Response(response));
	}

	fn report_progress(&self, fraction: f32) {
		self.calls.lock().push(CallbackCall::Progress(fraction));
	}

	fn abort(&self) {
		self.calls.lock().push(CallbackCall::Abort);
	}
}

/// [`SdkDriver`] that records which entry points were started.
#[derive(Default)]
pub struct RecordingSdk {
	started: Mutex<Vec<SdkEntryPoint>>,
	refuse: Mutex<Option<String>>,
}

impl RecordingSdk {
	pub fn started(&self) -> Vec<SdkEntryPoint> {
		self.started.lock().clone()
	}

	/// Makes subsequent starts fail with `reason`.
	pub fn refuse(&self, reason: impl Into<String>) {
		*self.refuse.lock() = Some(reason.into());
	}
}

impl SdkDriver for RecordingSdk {
	fn start_session(&self, entry: SdkEntryPoint) -> Result<()> {
		if let Some(reason) = self.refuse.lock().clone() {
			return Err(Error::SdkUnavailable(reason));
		}
		self.started.lock().push(entry);
		Ok(())
	}
}
