//! The transport boundary.
//!
//! # Design
//! The client builds bodies and parses responses without touching the
//! network; the caller supplies the one verb this API uses as a trait
//! implementation. The base URL is a construction argument of the
//! implementation, not global state, and the endpoint path is fixed:
//! every operation POSTs to `<base>/cdata.php`.

use crate::error::Error;

/// The path every operation posts to, relative to the configured base URL.
pub const ENDPOINT_PATH: &str = "/cdata.php";

/// Executes one HTTP round trip for the client.
///
/// Implementations POST `body` as `application/x-www-form-urlencoded` to the
/// endpoint they were constructed with and return the raw response text
/// without interpreting it; the client validates and decodes it. A transport
/// fails only when the round trip itself cannot complete.
pub trait Transport {
    fn post(&self, body: &str) -> Result<String, Error>;
}
