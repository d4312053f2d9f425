//! Session lifecycle controller.
//!
//! Picks which kind of session the SDK runs, manages the external reference
//! forwarded with it, and returns the bridge to Idle once the SDK reports
//! that it is done.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use sessionbridge_protocol::ExternalReferenceId;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::{SessionBridge, SessionPhase};
use crate::error::{Error, Result};

/// SDK operation that launches a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkEntryPoint {
	Liveness3d,
	LivenessThenFaceMatch,
	LivenessThenPhotoIdMatch,
	IdScanOnly,
	OfficialIdPhoto,
}

/// What happens to the external reference when a session kind starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
	/// Cleared; the session is not tied to any record.
	Clear,
	/// A new unique reference is generated.
	Fresh,
	/// An existing reference from a successful enrollment is required.
	Require,
	/// Whatever is currently held is forwarded unchanged.
	Keep,
}

/// Host-facing session kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
	/// Plain liveness check.
	Liveness,
	/// Liveness check stored as a new enrollment.
	Enrollment,
	/// Liveness then 3D match against a previous enrollment.
	Verify,
	/// Liveness then match against a scanned photo ID, enrolling the result.
	IdMatch,
	/// Standalone ID document scan.
	IdScanOnly,
	/// Liveness producing an official ID photo.
	SecureIdPhoto,
}

impl SessionKind {
	pub const ALL: [SessionKind; 6] = [
		SessionKind::Liveness,
		SessionKind::Enrollment,
		SessionKind::Verify,
		SessionKind::IdMatch,
		SessionKind::IdScanOnly,
		SessionKind::SecureIdPhoto,
	];

	/// String tag hosts use to request this kind.
	pub fn tag(self) -> &'static str {
		match self {
			Self::Liveness => "startLiveness",
			Self::Enrollment => "startEnrollment",
			Self::Verify => "startLivenessThenMatch",
			Self::IdMatch => "startLivenessThenIdMatch",
			Self::IdScanOnly => "startIdScanOnly",
			Self::SecureIdPhoto => "startSecureIdPhoto",
		}
	}

	pub fn entry_point(self) -> SdkEntryPoint {
		match self {
			Self::Liveness | Self::Enrollment => SdkEntryPoint::Liveness3d,
			Self::Verify => SdkEntryPoint::LivenessThenFaceMatch,
			Self::IdMatch => SdkEntryPoint::LivenessThenPhotoIdMatch,
			Self::IdScanOnly => SdkEntryPoint::IdScanOnly,
			Self::SecureIdPhoto => SdkEntryPoint::OfficialIdPhoto,
		}
	}

	pub fn reference_policy(self) -> ReferencePolicy {
		match self {
			Self::Liveness | Self::SecureIdPhoto => ReferencePolicy::Clear,
			Self::Enrollment | Self::IdMatch => ReferencePolicy::Fresh,
			Self::Verify => ReferencePolicy::Require,
			Self::IdScanOnly => ReferencePolicy::Keep,
		}
	}
}

impl fmt::Display for SessionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

impl FromStr for SessionKind {
	type Err = Error;

	fn from_str(tag: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.tag() == tag)
			.ok_or_else(|| Error::UnknownSessionKind(tag.to_string()))
	}
}

/// Final status the SDK reports when a session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
	SessionCompleted,
	RequestAborted,
	CameraPermissionsDenied,
	UserCancelledFaceScan,
	UserCancelledIdScan,
	LockedOut,
	CameraError,
	UnknownInternalError,
}

impl SessionStatus {
	pub fn is_success(self) -> bool {
		self == Self::SessionCompleted
	}

	pub fn description(self) -> &'static str {
		match self {
			Self::SessionCompleted => "Session was completed.",
			Self::RequestAborted => "Session was cancelled because abort() was called.",
			Self::CameraPermissionsDenied => "The SDK was unable to access the camera due to user settings or an administrator policy.",
			Self::UserCancelledFaceScan => "The user cancelled before performing enough scans to succeed.",
			Self::UserCancelledIdScan => "The user cancelled before completing all of the steps in the ID scan process.",
			Self::LockedOut => "The SDK is in a lockout state.",
			Self::CameraError => "Session cancelled due to a camera error.",
			Self::UnknownInternalError => "Session failed because an unknown or unexpected error occurred.",
		}
	}
}

/// The capture SDK's session-start surface.
pub trait SdkDriver: Send + Sync {
	/// Launches a session. The SDK later calls
	/// [`SessionBridge::on_session_request`] and finally reports its exit
	/// status through [`SessionController::on_sdk_exit`].
	fn start_session(&self, entry: SdkEntryPoint) -> Result<()>;
}

/// Generates unique external references.
#[derive(Debug, Clone)]
pub struct ReferenceGenerator {
	prefix: String,
}

impl ReferenceGenerator {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into() }
	}

	pub fn generate(&self) -> ExternalReferenceId {
		ExternalReferenceId::with_prefix(&self.prefix, Uuid::new_v4())
	}
}

/// Result of a successful [`SessionController::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
	pub kind: SessionKind,
	pub entry_point: SdkEntryPoint,
	pub external_reference_id: Option<ExternalReferenceId>,
}

/// Orchestrates session kinds on top of a [`SessionBridge`].
pub struct SessionController {
	bridge: Arc<SessionBridge>,
	sdk: Arc<dyn SdkDriver>,
	references: ReferenceGenerator,
	current: Mutex<Option<SessionKind>>,
}

impl SessionController {
	pub fn new(bridge: Arc<SessionBridge>, sdk: Arc<dyn SdkDriver>, references: ReferenceGenerator) -> Self {
		Self {
			bridge,
			sdk,
			references,
			current: Mutex::new(None),
		}
	}

	pub fn bridge(&self) -> &Arc<SessionBridge> {
		&self.bridge
	}

	/// Session kind currently running, if any.
	pub fn current_kind(&self) -> Option<SessionKind> {
		*self.current.lock()
	}

	/// Starts a session of `kind` on the SDK.
	///
	/// # Errors
	///
	/// - [`Error::AlreadyActive`] if a session is running or the bridge has not been reset.
	/// - [`Error::MissingReference`] for a verification without a prior enrollment.
	/// - Whatever the [`SdkDriver`] returns when it refuses to start.
	///
	/// None of these reach the SDK.
	pub fn start(&self, kind: SessionKind) -> Result<SessionTicket> {
		let reference = {
			let mut current = self.current.lock();
			if current.is_some() || self.bridge.phase() != SessionPhase::Idle {
				return Err(Error::AlreadyActive {
					active: self.bridge.active_correlation_id(),
				});
			}

			let reference = match kind.reference_policy() {
				ReferencePolicy::Clear => None,
				ReferencePolicy::Fresh => Some(self.references.generate()),
				ReferencePolicy::Require => Some(self.bridge.external_reference().ok_or(Error::MissingReference)?),
				ReferencePolicy::Keep => self.bridge.external_reference(),
			};

			self.bridge.arm_reference(reference.clone());
			*current = Some(kind);
			reference
		};

		let entry_point = kind.entry_point();
		if let Err(err) = self.sdk.start_session(entry_point) {
			warn!(target = "sessionbridge.lifecycle", %kind, error = %err, "SDK refused to start session");
			*self.current.lock() = None;
			if kind.reference_policy() == ReferencePolicy::Fresh {
				self.bridge.arm_reference(None);
			}
			return Err(err);
		}

		info!(
			target = "sessionbridge.lifecycle",
			%kind,
			?entry_point,
			has_reference = reference.is_some(),
			"session started"
		);

		Ok(SessionTicket {
			kind,
			entry_point,
			external_reference_id: reference,
		})
	}

	/// Parses a host-facing tag such as `startLiveness` and starts that kind.
	pub fn start_tagged(&self, tag: &str) -> Result<SessionTicket> {
		self.start(tag.parse()?)
	}

	/// Host-level cancellation of the running SDK session.
	pub fn cancel(&self) -> bool {
		self.bridge.cancel()
	}

	/// Handles the SDK's final completion signal.
	///
	/// Resets the bridge to Idle and clears the external reference unless the
	/// session completed. Returns the kind that ended.
	pub fn on_sdk_exit(&self, status: SessionStatus) -> Option<SessionKind> {
		let kind = self.current.lock().take();
		let previous = self.bridge.reset();

		if !status.is_success() {
			self.bridge.arm_reference(None);
		}

		info!(
			target = "sessionbridge.lifecycle",
			kind = ?kind,
			?status,
			bridge_phase = ?previous,
			"{}",
			status.description()
		);
		kind
	}

	pub fn external_reference(&self) -> Option<ExternalReferenceId> {
		self.bridge.external_reference()
	}

	/// Explicitly forgets a reference retained from a successful session.
	pub fn clear_reference(&self) {
		debug!(target = "sessionbridge.lifecycle", "external reference cleared");
		self.bridge.arm_reference(None);
	}
}
