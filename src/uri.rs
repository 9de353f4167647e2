//! Helpers for picking apart request URIs.
//!
//! The server hands the [`Request`] uri to handlers exactly as it appeared on
//! the wire. These helpers split off the query string and percent-decode the
//! pieces for handlers that want structured access.
//!
//! [`Request`]: crate::server::request::Request

use percent_encoding::percent_decode_str;

/// Decode a form-style URI component: percent escapes are unescaped and `+`
/// becomes a space. Invalid UTF-8 sequences are replaced, never an error.
pub fn url_decode(component: &str) -> String {
    let unplussed = component.replace('+', " ");
    percent_decode_str(&unplussed).decode_utf8_lossy().into_owned()
}

/// Split a request URI into its resource path and query parameters.
///
/// Parameters keep their encounter order, duplicates included. A parameter
/// without a `=` gets an empty value; parameters with an empty name are
/// dropped. Both the resource and the parameters are decoded with
/// [`url_decode`].
pub fn split_uri(uri: &str) -> (String, Vec<(String, String)>) {
    match uri.split_once('?') {
        None => (url_decode(uri), Vec::new()),
        Some((resource, query)) => {
            let params = url::form_urlencoded::parse(query.as_bytes())
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect();
            (url_decode(resource), params)
        }
    }
}
