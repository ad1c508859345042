//! The XML codec: request documents out, response documents in.
//!
//! Encoding and decoding are independent directions; both work on dynamic
//! string-keyed structures because the remote schema is configured per
//! account, not known at compile time.

mod decode;
mod encode;

pub use decode::{check_well_formed, parse_contacts, parse_id_name_map, parse_schema};
pub use encode::{contact_id_xml, contact_xml, search_xml};
