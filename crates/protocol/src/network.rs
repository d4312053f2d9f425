//! JSON bodies exchanged between the processor and its webservice.
//!
//! Request:
//! ```json
//! { "requestBlob": "<SDK request blob>", "externalDatabaseRefID": "enroll_abc" }
//! ```
//!
//! Response:
//! ```json
//! { "responseBlob": "<SDK response blob>", "result": { "officialIDPhotoImage": "<base64 jpeg>" } }
//! ```
//!
//! Both blobs are carried as the SDK's own text, unchanged. They are not
//! re-encoded on the way out or decoded on the way back.

use serde::{Deserialize, Serialize};

use crate::ids::ExternalReferenceId;

/// Header carrying the device key identifier.
pub const DEVICE_KEY_HEADER: &str = "X-Device-Key";
/// Header carrying the client user agent string.
pub const USER_AGENT_HEADER: &str = "X-User-Agent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequestBody {
	#[serde(rename = "requestBlob")]
	pub request_blob: String,
	#[serde(rename = "externalDatabaseRefID", default, skip_serializing_if = "Option::is_none")]
	pub external_database_ref_id: Option<ExternalReferenceId>,
}

/// Webservice reply. Every field is optional so a malformed reply can be
/// told apart from a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponseBody {
	#[serde(rename = "responseBlob", default, skip_serializing_if = "Option::is_none")]
	pub response_blob: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<ProcessResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
	#[serde(rename = "officialIDPhotoImage", default, skip_serializing_if = "Option::is_none")]
	pub official_id_photo_image: Option<String>,
}

impl ProcessResponseBody {
	/// Non-empty official ID photo, when the webservice returned one.
	pub fn official_id_photo(&self) -> Option<&str> {
		self.result
			.as_ref()
			.and_then(|result| result.official_id_photo_image.as_deref())
			.filter(|photo| !photo.is_empty())
	}
}
