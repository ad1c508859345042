//! Error types for the contact API client.
//!
//! # Design
//! Construction problems and malformed responses are the two failure modes
//! the remote API actually exhibits; everything else (empty result sets,
//! absent optional attributes) is modeled as empty values, not errors.
//! `InvalidXml` carries the offending response text verbatim so callers can
//! log what the server really sent.

use std::fmt;

/// Errors returned by [`crate::Client`] and the XML codec.
#[derive(Debug)]
pub enum Error {
    /// A required credential was missing or empty at construction. The
    /// payload names the offending argument (`"api_id"` or `"api_key"`).
    MissingCredentials(&'static str),

    /// The response body is not well-formed XML. Carries the raw text.
    InvalidXml { body: String },

    /// A request payload could not be serialized to XML.
    Serialize(String),

    /// The transport adapter failed to complete the HTTP round trip.
    Transport(String),

    /// An `add` response was well-formed XML but contained no contact.
    MissingContact,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingCredentials(name) => {
                write!(f, "missing required credential: {name}")
            }
            Error::InvalidXml { body } => {
                write!(f, "response is not well-formed XML: {body}")
            }
            Error::Serialize(msg) => write!(f, "XML serialization failed: {msg}"),
            Error::Transport(msg) => write!(f, "transport failed: {msg}"),
            Error::MissingContact => write!(f, "response contained no contact"),
        }
    }
}

impl std::error::Error for Error {}
