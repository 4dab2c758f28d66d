//! Typed client core for the On The Map session and location-record
//! backends.
//!
//! # Overview
//! Two clients with the same three layers:
//! - a [`Transport`] that performs one HTTP round trip,
//! - the [`envelope`] decoder that strips backend framing, parses JSON and
//!   recognises in-band backend errors,
//! - façade methods ([`SessionClient`], [`RecordClient`]) that build a
//!   request, send it, decode the response into a per-operation schema and
//!   return a typed result or an [`ApiError`].
//!
//! # Design
//! - Each operation is split into `build_*` (produces an [`HttpRequest`])
//!   and `parse_*` (consumes an [`HttpResponse`]); the async façade just
//!   chains them through the transport. Hosts that do their own I/O can
//!   use the halves directly.
//! - Client state lives in an explicit [`ClientContext`] passed to each
//!   call; there is no global instance.
//! - No retries, no request queue. Each call is one independent round trip.

pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod http;
pub mod records;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use context::ClientContext;
pub use envelope::{decode, Envelope, StatusFields};
pub use error::{ApiError, DecodeError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use records::RecordClient;
pub use session::SessionClient;
#[cfg(feature = "http-transport")]
pub use transport::HttpTransport;
pub use transport::Transport;
pub use types::{
    CreatedRecord, EndedSession, LocationDraft, LocationRecord, LocationRecordSet, Profile, RecordQuery, Session,
};
