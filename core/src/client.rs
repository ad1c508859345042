//! The contact API client.
//!
//! # Design
//! `Client` holds immutable credentials and a [`Transport`]; each operation
//! is one stateless round trip composed from the same three steps: build the
//! form body, POST it, validate and decode the response. The well-formedness
//! check in [`Client::handle_response`] is the single validation point —
//! every operation routes its raw response through it before decoding.

use crate::auth::Credentials;
use crate::error::Error;
use crate::request::build_request_body;
use crate::transport::Transport;
use crate::types::{Contact, Criterion, IdNameMap, Schema};
use crate::xml;

/// Synchronous client for the contact API.
///
/// Stateless apart from the credentials fixed at construction, so a single
/// instance can serve any number of calls, from any number of threads.
#[derive(Debug, Clone)]
pub struct Client<T> {
    credentials: Credentials,
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Missing or empty credentials fail here, not at request time.
    pub fn new(
        api_id: impl Into<String>,
        api_key: impl Into<String>,
        transport: T,
    ) -> Result<Self, Error> {
        Ok(Self {
            credentials: Credentials::new(api_id, api_key)?,
            transport,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Search for contacts matching every criterion, in criterion order.
    /// An empty result list means nothing matched, not a failure.
    pub fn search(&self, criteria: &[Criterion]) -> Result<Vec<Contact>, Error> {
        let data = xml::search_xml(criteria)?;
        let response = self.post("search", &[("data", &data)])?;
        xml::parse_contacts(&response)
    }

    /// Create a contact, or update one when `contact` carries an id.
    /// Returns the stored record as the server reports it.
    pub fn add(&self, contact: &Contact) -> Result<Contact, Error> {
        let data = xml::contact_xml(contact)?;
        let response = self.post("add", &[("return_id", "1"), ("data", &data)])?;
        xml::parse_contacts(&response)?
            .into_iter()
            .next()
            .ok_or(Error::MissingContact)
    }

    /// Fetch contacts by id. Ids unknown to the server are silently absent
    /// from the result; callers that care must reconcile against the input.
    pub fn fetch(&self, ids: &[u32]) -> Result<Vec<Contact>, Error> {
        let data = xml::contact_id_xml(ids);
        let response = self.post("fetch", &[("data", &data)])?;
        xml::parse_contacts(&response)
    }

    /// All contact tags, id to name.
    pub fn pull_tags(&self) -> Result<IdNameMap, Error> {
        let response = self.post("pull_tag", &[])?;
        xml::parse_id_name_map(&response, "tag")
    }

    /// All sequences, id to name.
    pub fn fetch_sequences(&self) -> Result<IdNameMap, Error> {
        let response = self.post("fetch_sequences", &[])?;
        xml::parse_id_name_map(&response, "sequence")
    }

    /// The account's field schema: groups, fields, editability, and value
    /// constraints.
    pub fn schema(&self) -> Result<Schema, Error> {
        let response = self.post("key", &[])?;
        xml::parse_schema(&response)
    }

    /// Pass a raw response through unchanged when it is well-formed XML;
    /// anything else fails with [`Error::InvalidXml`] carrying the text.
    pub fn handle_response(&self, response: String) -> Result<String, Error> {
        xml::check_well_formed(&response)?;
        Ok(response)
    }

    fn post(&self, operation: &str, params: &[(&str, &str)]) -> Result<String, Error> {
        let body = build_request_body(operation, params, &self.credentials);
        self.handle_response(self.transport.post(&body)?)
    }
}
