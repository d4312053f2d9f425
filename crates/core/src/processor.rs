//! HTTP processor: the network client on the far side of the blob channel.
//!
//! For every opened session it posts the request blob to the configured
//! webservice, reports upload progress while the body streams out, and
//! answers with exactly one terminal event.
//!
//! Blobs travel as the SDK's text: the payload bytes go into `requestBlob`
//! verbatim and `responseBlob` comes back to the SDK as-is.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use parking_lot::Mutex;
use sessionbridge_protocol::{Blob, CorrelationId, DEVICE_KEY_HEADER, ProcessRequestBody, ProcessResponseBody, USER_AGENT_HEADER};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::channel::{EventSink, OpenedSession, Processor};
use crate::config::BridgeConfig;
use crate::error::{self, Result};

/// Why a webservice exchange produced no response blob.
///
/// Never crosses the channel; every variant becomes `CatastrophicError`.
#[derive(Debug, Error)]
pub enum ProcessorError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("request blob is not UTF-8 text")]
	NonTextPayload,

	#[error("failed to encode request body: {0}")]
	Encode(serde_json::Error),

	#[error("webservice reply is not valid JSON: {0}")]
	Decode(String),

	#[error("webservice reply (status {status}) has no responseBlob")]
	MissingResponseBlob { status: u16 },
}

pub struct HttpProcessor {
	client: reqwest::Client,
	endpoint: String,
	max_retries: u32,
	retry_delay: Duration,
	chunk_size: usize,
	latest_official_id_photo: Mutex<Option<String>>,
}

impl HttpProcessor {
	pub fn new(config: &BridgeConfig) -> Result<Self> {
		config.validate()?;
		let client = reqwest::Client::builder()
			.timeout(config.request_timeout())
			.build()
			.map_err(|err| error::Error::Config(format!("failed to build HTTP client: {err}")))?;

		Ok(Self {
			client,
			endpoint: config.endpoint.clone(),
			max_retries: config.max_retries,
			retry_delay: config.retry_delay(),
			chunk_size: config.upload_chunk_size,
			latest_official_id_photo: Mutex::new(None),
		})
	}

	/// Official ID photo from the most recent reply that carried one.
	pub fn latest_official_id_photo(&self) -> Option<String> {
		self.latest_official_id_photo.lock().clone()
	}

	async fn exchange(&self, session: &OpenedSession, sink: &EventSink) -> std::result::Result<Blob, ProcessorError> {
		let request_blob = std::str::from_utf8(session.payload.as_bytes()).map_err(|_| ProcessorError::NonTextPayload)?;
		let body = serde_json::to_vec(&ProcessRequestBody {
			request_blob: request_blob.to_string(),
			external_database_ref_id: session.external_reference_id.clone(),
		})
		.map_err(ProcessorError::Encode)?;

		let response = self.send_with_retry(session, body, sink).await?;
		let status = response.status().as_u16();
		let raw = response.bytes().await?;
		let reply: ProcessResponseBody = serde_json::from_slice(&raw).map_err(|err| ProcessorError::Decode(err.to_string()))?;

		if let Some(photo) = reply.official_id_photo() {
			debug!(
				target = "sessionbridge.processor",
				correlation_id = %session.correlation_id,
				"official ID photo received"
			);
			*self.latest_official_id_photo.lock() = Some(photo.to_string());
		}

		reply
			.response_blob
			.map(|blob| Blob::new(blob.into_bytes()))
			.ok_or(ProcessorError::MissingResponseBlob { status })
	}

	/// Posts `body`, retrying transport failures up to `max_retries` times.
	async fn send_with_retry(&self, session: &OpenedSession, body: Vec<u8>, sink: &EventSink) -> std::result::Result<reqwest::Response, ProcessorError> {
		let mut attempt = 0;
		loop {
			let mut request = self
				.client
				.post(&self.endpoint)
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.header(USER_AGENT_HEADER, &session.client_metadata.user_agent)
				.body(progress_body(body.clone(), self.chunk_size, session.correlation_id.clone(), sink.clone()));
			if let Some(device_key) = &session.client_metadata.device_key_identifier {
				request = request.header(DEVICE_KEY_HEADER, device_key);
			}

			match request.send().await {
				Ok(response) => return Ok(response),
				Err(err) if attempt < self.max_retries => {
					attempt += 1;
					warn!(
						target = "sessionbridge.processor",
						correlation_id = %session.correlation_id,
						attempt,
						error = %err,
						"request failed; retrying"
					);
					tokio::time::sleep(self.retry_delay).await;
				}
				Err(err) => return Err(err.into()),
			}
		}
	}
}

impl Processor for HttpProcessor {
	fn process(self: Arc<Self>, session: OpenedSession, sink: EventSink) -> Pin<Box<dyn Future<Output = ()> + Send>> {
		Box::pin(async move {
			let correlation_id = session.correlation_id.clone();
			let delivered = match self.exchange(&session, &sink).await {
				Ok(response) => {
					info!(
						target = "sessionbridge.processor",
						%correlation_id,
						response_len = response.len(),
						"response blob received"
					);
					sink.response(&correlation_id, response)
				}
				Err(err) => {
					error!(
						target = "sessionbridge.processor",
						%correlation_id,
						error = %err,
						"exchange failed; reporting catastrophic error"
					);
					sink.catastrophic(&correlation_id)
				}
			};

			if delivered.is_err() {
				warn!(target = "sessionbridge.processor", %correlation_id, "bridge went away before the terminal event");
			}
		})
	}
}

/// Streams `body` in `chunk_size` pieces, reporting the uploaded fraction as
/// each piece is handed to the transport.
fn progress_body(body: Vec<u8>, chunk_size: usize, correlation_id: CorrelationId, sink: EventSink) -> reqwest::Body {
	let total = body.len().max(1) as f32;
	let chunks: Vec<Vec<u8>> = body.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect();
	let mut sent = 0usize;

	reqwest::Body::wrap_stream(stream::iter(chunks.into_iter().map(move |chunk| {
		sent += chunk.len();
		let _ = sink.progress(&correlation_id, sent as f32 / total);
		Ok::<_, std::io::Error>(chunk)
	})))
}
