//! Synchronous client core for a legacy contact-management API.
//!
//! # Overview
//! The service speaks a form-encoded dialect over a single POST endpoint:
//! every call carries a `reqType` operation name, `Appid`/`Key` credentials,
//! and for most operations an XML `data` payload. Responses are XML documents
//! describing contacts, listings, or the account schema.
//!
//! # Design
//! - `Client` is generic over [`transport::Transport`], so the HTTP layer is
//!   pluggable and the core stays deterministic under test.
//! - Encoding and decoding live in `xml`; the client composes them with
//!   `request::build_request_body` and never touches raw bytes itself.
//! - Contacts preserve insertion order of groups and fields because the
//!   service is order-sensitive when mirroring records back.

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod transport;
pub mod types;
pub mod xml;

pub use auth::Credentials;
pub use client::Client;
pub use error::Error;
pub use transport::{Transport, ENDPOINT_PATH};
pub use types::{Contact, Criterion, FieldSchema, GroupSchema, IdNameMap, Schema};
