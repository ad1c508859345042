//! Request body assembly for the legacy form endpoint.

use crate::auth::Credentials;

/// Build the form body for one operation.
///
/// The layout is `reqType=<op>`, then the extra parameters in the order
/// supplied, then the `Appid`/`Key` pair, joined with `&`. A parameter named
/// `data` has its value XML-escaped so a document can travel as a form
/// value. Nothing is percent-encoded: the remote endpoint (and any test that
/// matches on the raw body) expects this exact byte layout.
pub fn build_request_body(
    operation: &str,
    params: &[(&str, &str)],
    credentials: &Credentials,
) -> String {
    let mut body = String::from("reqType=");
    body.push_str(operation);
    for (key, value) in params {
        body.push('&');
        body.push_str(key);
        body.push('=');
        if *key == "data" {
            body.push_str(&quick_xml::escape::escape(*value));
        } else {
            body.push_str(value);
        }
    }
    for (key, value) in credentials.auth_params() {
        body.push('&');
        body.push_str(key);
        body.push('=');
        body.push_str(value);
    }
    body
}
