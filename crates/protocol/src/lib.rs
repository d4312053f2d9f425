//! Wire types for the session bridge protocol.
//!
//! This crate contains the serde-serializable types exchanged between the
//! session bridge and the network processor on the far side of the blob
//! channel, plus the JSON bodies the processor exchanges with its webservice.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Opaque payloads: [`Blob`] never exposes its contents through `Debug`
//! * Stable: Changes only when the wire protocol changes
//!
//! The state machine that consumes these types lives in `sessionbridge`.

pub mod blob;
pub mod event;
pub mod ids;
pub mod network;

pub use blob::*;
pub use event::*;
pub use ids::*;
pub use network::*;
