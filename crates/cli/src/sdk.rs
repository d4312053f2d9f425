//! Stand-in for the capture SDK when driving sessions from the command line.

use parking_lot::Mutex;
use sessionbridge_protocol::Blob;
use sessionbridge::{Result, SdkDriver, SdkEntryPoint, SessionCallback};
use tokio::sync::mpsc;
use tracing::info;

/// Accepts every start and remembers the entry point it was asked for.
#[derive(Default)]
pub struct ScriptedSdk {
	started: Mutex<Option<SdkEntryPoint>>,
}

impl ScriptedSdk {
	pub fn started(&self) -> Option<SdkEntryPoint> {
		*self.started.lock()
	}
}

impl SdkDriver for ScriptedSdk {
	fn start_session(&self, entry: SdkEntryPoint) -> Result<()> {
		info!(target = "sbridge", ?entry, "scripted SDK session started");
		*self.started.lock() = Some(entry);
		Ok(())
	}
}

/// What the bridge told the SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkSignal {
	Progress(f32),
	Response(Blob),
	Aborted,
}

/// Forwards callback invocations to the command loop.
pub struct ForwardingCallback {
	tx: mpsc::UnboundedSender<SdkSignal>,
}

impl ForwardingCallback {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<SdkSignal>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl SessionCallback for ForwardingCallback {
	fn deliver_response(&self, response: Blob) {
		let _ = self.tx.send(SdkSignal::Response(response));
	}

	fn report_progress(&self, fraction: f32) {
		let _ = self.tx.send(SdkSignal::Progress(fraction));
	}

	fn abort(&self) {
		let _ = self.tx.send(SdkSignal::Aborted);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn forwarding_callback_preserves_order() {
		let (callback, mut rx) = ForwardingCallback::new();
		callback.report_progress(0.5);
		callback.deliver_response(Blob::new(b"done".to_vec()));

		assert_eq!(rx.try_recv().unwrap(), SdkSignal::Progress(0.5));
		assert_eq!(rx.try_recv().unwrap(), SdkSignal::Response(Blob::new(b"done".to_vec())));
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn scripted_sdk_records_entry_point() {
		let sdk = ScriptedSdk::default();
		assert_eq!(sdk.started(), None);
		sdk.start_session(SdkEntryPoint::IdScanOnly).unwrap();
		assert_eq!(sdk.started(), Some(SdkEntryPoint::IdScanOnly));
	}
}
