//! Session callback contract.
//!
//! [`SessionCallback`] is what the SDK adapter implements; the bridge never
//! calls it directly. Every call goes through a [`CallbackHandle`], which is
//! bound to one session and expires once that session reaches a terminal
//! state. Calls through an expired handle fail with
//! [`Error::InvalidHandle`] and never reach the SDK.
//!
//! Progress is forwarded while holding the handle's liveness lock, so once
//! a terminal call or an expiry returns, no further progress can reach the
//! SDK from any thread. The lock is reentrant: an SDK callback may cancel or
//! reset the bridge from inside `report_progress`.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use sessionbridge_protocol::{Blob, CorrelationId};

use crate::error::{Error, Result};

/// Operations the SDK exposes for a pending session request.
pub trait SessionCallback: Send + Sync {
	/// Hands the processor's response to the SDK so the session can proceed.
	fn deliver_response(&self, response: Blob);

	/// Updates the SDK's upload progress indicator. Always within `[0.0, 1.0]`.
	fn report_progress(&self, fraction: f32);

	/// Tells the SDK the session cannot continue.
	fn abort(&self);
}

/// Clamps a progress fraction into `[0.0, 1.0]`. NaN maps to `0.0`.
pub fn clamp_progress(fraction: f32) -> f32 {
	if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) }
}

struct HandleInner {
	correlation_id: CorrelationId,
	callback: Arc<dyn SessionCallback>,
	live: ReentrantMutex<Cell<bool>>,
}

/// Session-scoped capability for calling back into the SDK.
///
/// Cloning yields another reference to the same capability; expiring one
/// clone expires all of them.
#[derive(Clone)]
pub struct CallbackHandle {
	inner: Arc<HandleInner>,
}

impl CallbackHandle {
	pub(crate) fn new(correlation_id: CorrelationId, callback: Arc<dyn SessionCallback>) -> Self {
		Self {
			inner: Arc::new(HandleInner {
				correlation_id,
				callback,
				live: ReentrantMutex::new(Cell::new(true)),
			}),
		}
	}

	pub fn correlation_id(&self) -> &CorrelationId {
		&self.inner.correlation_id
	}

	pub fn is_valid(&self) -> bool {
		self.inner.live.lock().get()
	}

	/// Delivers `response` to the SDK and expires the handle.
	pub fn deliver_response(&self, response: Blob) -> Result<()> {
		self.consume()?;
		self.inner.callback.deliver_response(response);
		Ok(())
	}

	/// Forwards a clamped progress fraction; returns the value the SDK saw.
	pub fn report_progress(&self, fraction: f32) -> Result<f32> {
		let live = self.inner.live.lock();
		if !live.get() {
			return Err(self.invalid());
		}
		let clamped = clamp_progress(fraction);
		self.inner.callback.report_progress(clamped);
		drop(live);
		Ok(clamped)
	}

	/// Aborts the SDK session and expires the handle.
	pub fn abort(&self) -> Result<()> {
		self.consume()?;
		self.inner.callback.abort();
		Ok(())
	}

	/// Expires the handle without notifying the SDK. Returns whether it was live.
	pub(crate) fn expire(&self) -> bool {
		self.inner.live.lock().replace(false)
	}

	fn consume(&self) -> Result<()> {
		if self.expire() { Ok(()) } else { Err(self.invalid()) }
	}

	fn invalid(&self) -> Error {
		Error::InvalidHandle {
			correlation_id: self.inner.correlation_id.clone(),
		}
	}
}

impl fmt::Debug for CallbackHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackHandle")
			.field("correlation_id", &self.inner.correlation_id)
			.field("valid", &self.is_valid())
			.finish()
	}
}
