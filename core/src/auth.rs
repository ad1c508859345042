//! API credentials and the fixed auth pair sent with every request.

use crate::error::Error;

/// Immutable API credentials, validated once at construction.
///
/// The remote endpoint authenticates every request with the same two form
/// fields, so the credentials double as the trailing `Appid`/`Key` pair of
/// each request body. Read-only after construction, which is what makes a
/// [`crate::Client`] safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    api_id: String,
    api_key: String,
}

impl Credentials {
    /// Either value being empty is a construction error, not a request
    /// error: a client without credentials can never make a valid call.
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        let api_id = api_id.into();
        let api_key = api_key.into();
        if api_id.is_empty() {
            return Err(Error::MissingCredentials("api_id"));
        }
        if api_key.is_empty() {
            return Err(Error::MissingCredentials("api_key"));
        }
        Ok(Self { api_id, api_key })
    }

    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The two-entry auth mapping appended verbatim to every request body,
    /// always in `Appid`, `Key` order.
    pub fn auth_params(&self) -> [(&'static str, &str); 2] {
        [("Appid", &self.api_id), ("Key", &self.api_key)]
    }
}
