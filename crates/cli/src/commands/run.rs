use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use sessionbridge::{BridgeConfig, Error, HttpProcessor, SdkEntryPoint, SessionBridge, SessionController, SessionKind, SessionStatus};
use sessionbridge_protocol::{Blob, CorrelationId, ExternalReferenceId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::sdk::{ForwardingCallback, ScriptedSdk, SdkSignal};

/// One line of `sbridge run` output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
	Started {
		tag: &'static str,
		#[serde(rename = "entryPoint")]
		entry_point: String,
		#[serde(rename = "externalReferenceId")]
		external_reference_id: Option<ExternalReferenceId>,
	},
	Progress {
		fraction: f32,
	},
	Response {
		bytes: Blob,
		len: usize,
	},
	Aborted,
	Cancelled,
	Exit {
		status: String,
		description: &'static str,
		#[serde(rename = "externalReferenceId")]
		external_reference_id: Option<ExternalReferenceId>,
		#[serde(rename = "officialIdPhoto")]
		official_id_photo: bool,
	},
}

impl OutputEvent {
	fn print(&self) -> Result<()> {
		println!("{}", serde_json::to_string(self)?);
		Ok(())
	}
}

pub(super) async fn run_session(config: &BridgeConfig, tag: &str, payload: Blob, reference: Option<String>) -> Result<bool> {
	let kind: SessionKind = tag.parse()?;

	let parts = sessionbridge::pair();
	let bridge = Arc::new(SessionBridge::new(Arc::new(parts.channel), config.client_metadata()));
	let processor = Arc::new(HttpProcessor::new(config)?);
	let serve_task = tokio::spawn(parts.endpoint.serve(Arc::clone(&processor)));
	let run_task = {
		let bridge = Arc::clone(&bridge);
		let inbound_rx = parts.inbound_rx;
		tokio::spawn(async move { bridge.run(inbound_rx).await })
	};

	let sdk = Arc::new(ScriptedSdk::default());
	let controller = SessionController::new(Arc::clone(&bridge), sdk.clone(), config.reference_generator());
	if let Some(reference) = reference {
		bridge.arm_reference(ExternalReferenceId::new(reference));
	}

	let outcome = drive(&controller, kind, payload).await;
	serve_task.abort();
	run_task.abort();
	let status = outcome?;

	OutputEvent::Exit {
		status: format!("{status:?}"),
		description: status.description(),
		external_reference_id: controller.external_reference(),
		official_id_photo: processor.latest_official_id_photo().is_some(),
	}
	.print()?;

	info!(target = "sbridge", %kind, entry = ?sdk.started(), ?status, "session finished");
	Ok(status.is_success())
}

/// Plays the SDK's part: start, issue one request, wait for the verdict.
async fn drive(controller: &SessionController, kind: SessionKind, payload: Blob) -> Result<SessionStatus> {
	let ticket = controller.start(kind)?;
	OutputEvent::Started {
		tag: kind.tag(),
		entry_point: format!("{:?}", ticket.entry_point),
		external_reference_id: ticket.external_reference_id,
	}
	.print()?;

	let (callback, mut signals) = ForwardingCallback::new();
	let correlation_id = CorrelationId::new(format!("{}-{}", kind.tag(), Uuid::new_v4()));
	match controller.bridge().on_session_request(correlation_id, payload, Arc::new(callback)) {
		Ok(_handle) => {}
		// The bridge has already aborted through the callback.
		Err(Error::Channel(err)) => warn!(target = "sbridge", error = %err, "request never reached the processor"),
		Err(err) => {
			controller.on_sdk_exit(SessionStatus::UnknownInternalError);
			return Err(err.into());
		}
	}

	let status = loop {
		tokio::select! {
			signal = signals.recv() => match signal {
				Some(SdkSignal::Progress(fraction)) => OutputEvent::Progress { fraction }.print()?,
				Some(SdkSignal::Response(bytes)) => {
					OutputEvent::Response { len: bytes.len(), bytes }.print()?;
					break SessionStatus::SessionCompleted;
				}
				Some(SdkSignal::Aborted) => {
					OutputEvent::Aborted.print()?;
					break SessionStatus::RequestAborted;
				}
				None => break SessionStatus::UnknownInternalError,
			},
			_ = tokio::signal::ctrl_c() => {
				controller.cancel();
				OutputEvent::Cancelled.print()?;
				break cancelled_status(kind);
			}
		}
	};

	controller.on_sdk_exit(status);
	Ok(status)
}

fn cancelled_status(kind: SessionKind) -> SessionStatus {
	match kind.entry_point() {
		SdkEntryPoint::IdScanOnly => SessionStatus::UserCancelledIdScan,
		_ => SessionStatus::UserCancelledFaceScan,
	}
}
