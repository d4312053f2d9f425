// sessionbridge: host-side bridge between a biometric SDK and the processor
// that talks to the webservice.
//
// The SDK hands the bridge opaque request blobs; the bridge forwards them over
// a blob channel and relays progress, responses and failures back through a
// single-use callback handle.

pub mod bridge;
pub mod callback;
pub mod channel;
pub mod config;
pub mod error;
pub mod fake;
pub mod lifecycle;
pub mod processor;

pub use bridge::{SessionBridge, SessionOutcome, SessionPhase, SessionRequest};
pub use callback::{CallbackHandle, SessionCallback};
pub use channel::{BlobChannel, ChannelParts, EventSink, MpscChannel, OpenedSession, Processor, ProcessorEndpoint, pair};
pub use config::BridgeConfig;
pub use error::{ChannelError, Error, Result, Violation};
pub use lifecycle::{ReferenceGenerator, ReferencePolicy, SdkDriver, SdkEntryPoint, SessionController, SessionKind, SessionStatus, SessionTicket};
pub use processor::{HttpProcessor, ProcessorError};
pub use sessionbridge_protocol as protocol;
