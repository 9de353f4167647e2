use bytes::BytesMut;

use crate::runtime_config::RuntimeConfig;

/// Maximum number of headers accepted per request. 32 handles modern
/// API gateway/proxy traffic; anything beyond is treated as malformed.
pub const MAX_HEADERS: usize = 32;

/// A single HTTP header as it appeared on the wire.
///
/// Duplicate names are permitted and preserved in encounter order, both on
/// requests and replies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A parsed HTTP request, handed to the [`RequestHandler`] for exactly one
/// invocation and discarded afterwards.
///
/// The `uri` is the raw request target as sent by the client, neither
/// normalized nor percent-decoded; see [`crate::uri::split_uri`] for
/// decoding helpers.
///
/// [`RequestHandler`]: crate::handler::RequestHandler
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub http_version_major: u8,
    pub http_version_minor: u8,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Request {
    /// Look up the first header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Whether the connection should stay open after the response, per
    /// protocol-version defaults: HTTP/1.1 keeps the connection unless the
    /// client sent `Connection: close`, HTTP/1.0 closes unless it sent
    /// `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.http_version_major == 1 && self.http_version_minor >= 1,
        }
    }
}

/// Why an incoming byte stream could not be turned into a [`Request`].
///
/// Every variant is answered with the `400 Bad Request` stock reply; the
/// handler is never invoked for these connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Invalid request line or header framing.
    Malformed,
    /// Header section exceeded `max_header_bytes`.
    HeadersTooLarge,
    /// Declared `Content-Length` exceeded `max_body_bytes`.
    BodyTooLarge,
    /// `Transfer-Encoding: chunked` is not supported.
    UnsupportedTransferEncoding,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            DecodeError::Malformed => "malformed request",
            DecodeError::HeadersTooLarge => "header section too large",
            DecodeError::BodyTooLarge => "request body too large",
            DecodeError::UnsupportedTransferEncoding => "chunked transfer encoding not supported",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for DecodeError {}

/// Incrementally decode one request from `buf`.
///
/// Returns `Ok(Some(request))` when a complete request (headers plus any
/// `Content-Length` body) is available, consuming its bytes from `buf` and
/// leaving any pipelined remainder in place. Returns `Ok(None)` when more
/// bytes are required.
pub(crate) fn decode_request(
    buf: &mut BytesMut,
    config: &RuntimeConfig,
) -> Result<Option<Request>, DecodeError> {
    let (header_len, mut request, content_length) = {
        let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parsed = httparse::Request::new(&mut header_storage);
        match parsed.parse(&buf[..]) {
            Ok(httparse::Status::Complete(header_len)) => {
                let method = parsed.method.ok_or(DecodeError::Malformed)?;
                let uri = parsed.path.ok_or(DecodeError::Malformed)?;
                let minor = parsed.version.ok_or(DecodeError::Malformed)?;

                let mut headers = Vec::with_capacity(parsed.headers.len());
                let mut content_length = 0usize;
                for h in parsed.headers.iter() {
                    let value = String::from_utf8_lossy(h.value).into_owned();
                    if h.name.eq_ignore_ascii_case("content-length") {
                        content_length = value
                            .trim()
                            .parse()
                            .map_err(|_| DecodeError::Malformed)?;
                    }
                    if h.name.eq_ignore_ascii_case("transfer-encoding")
                        && value.to_ascii_lowercase().contains("chunked")
                    {
                        return Err(DecodeError::UnsupportedTransferEncoding);
                    }
                    headers.push(Header::new(h.name, value));
                }

                let request = Request {
                    method: method.to_string(),
                    uri: uri.to_string(),
                    http_version_major: 1,
                    http_version_minor: minor,
                    headers,
                    body: Vec::new(),
                };
                (header_len, request, content_length)
            }
            Ok(httparse::Status::Partial) => {
                if buf.len() > config.max_header_bytes {
                    return Err(DecodeError::HeadersTooLarge);
                }
                return Ok(None);
            }
            Err(_) => return Err(DecodeError::Malformed),
        }
    };

    if content_length > config.max_body_bytes {
        return Err(DecodeError::BodyTooLarge);
    }
    let total = header_len + content_length;
    if buf.len() < total {
        return Ok(None);
    }

    let frame = buf.split_to(total);
    request.body = frame[header_len..].to_vec();
    Ok(Some(request))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    fn decode(bytes: &[u8]) -> Result<Option<Request>, DecodeError> {
        let mut buf = BytesMut::from(bytes);
        decode_request(&mut buf, &config())
    }

    #[test]
    fn test_decode_simple_get() {
        let req = decode(b"GET /foo HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.uri, "/foo");
        assert_eq!(req.http_version_major, 1);
        assert_eq!(req.http_version_minor, 1);
        assert_eq!(req.headers, vec![Header::new("Host", "x")]);
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_decode_preserves_duplicate_headers_in_order() {
        let req = decode(b"GET / HTTP/1.1\r\nAccept: a\r\nAccept: b\r\nHost: x\r\n\r\n")
            .unwrap()
            .unwrap();
        let names: Vec<&str> = req.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Accept", "Accept", "Host"]);
        assert_eq!(req.headers[0].value, "a");
        assert_eq!(req.headers[1].value, "b");
    }

    #[test]
    fn test_decode_partial_needs_more_bytes() {
        assert_eq!(decode(b"GET /foo HTT").unwrap(), None);
        assert_eq!(decode(b"GET /foo HTTP/1.1\r\nHost: x\r\n").unwrap(), None);
    }

    #[test]
    fn test_decode_waits_for_declared_body() {
        let mut buf = BytesMut::from(&b"POST /p HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel"[..]);
        assert_eq!(decode_request(&mut buf, &config()).unwrap(), None);
        buf.extend_from_slice(b"lo");
        let req = decode_request(&mut buf, &config()).unwrap().unwrap();
        assert_eq!(req.body, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_leaves_pipelined_remainder() {
        let mut buf = BytesMut::from(
            &b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n"[..],
        );
        let first = decode_request(&mut buf, &config()).unwrap().unwrap();
        assert_eq!(first.uri, "/a");
        let second = decode_request(&mut buf, &config()).unwrap().unwrap();
        assert_eq!(second.uri, "/b");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_malformed_request_line() {
        assert_eq!(decode(b"GET\r\n\r\n"), Err(DecodeError::Malformed));
        assert_eq!(
            decode(b"GET /foo NOTHTTP/9\r\n\r\n"),
            Err(DecodeError::Malformed)
        );
    }

    #[test]
    fn test_decode_rejects_invalid_content_length() {
        assert_eq!(
            decode(b"POST /p HTTP/1.1\r\nContent-Length: nope\r\n\r\n"),
            Err(DecodeError::Malformed)
        );
    }

    #[test]
    fn test_decode_rejects_chunked_transfer() {
        assert_eq!(
            decode(b"POST /p HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n"),
            Err(DecodeError::UnsupportedTransferEncoding)
        );
    }

    #[test]
    fn test_decode_rejects_oversized_body() {
        let mut cfg = config();
        cfg.max_body_bytes = 4;
        let mut buf = BytesMut::from(&b"POST /p HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..]);
        assert_eq!(
            decode_request(&mut buf, &cfg),
            Err(DecodeError::BodyTooLarge)
        );
    }

    #[test]
    fn test_decode_rejects_oversized_header_section() {
        let mut cfg = config();
        cfg.max_header_bytes = 64;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"GET / HTTP/1.1\r\nX-Padding: ");
        buf.extend_from_slice(&vec![b'a'; 128]);
        assert_eq!(
            decode_request(&mut buf, &cfg),
            Err(DecodeError::HeadersTooLarge)
        );
    }

    #[test]
    fn test_keep_alive_defaults() {
        let mut req = Request {
            http_version_major: 1,
            http_version_minor: 1,
            ..Default::default()
        };
        assert!(req.keep_alive());
        req.http_version_minor = 0;
        assert!(!req.keep_alive());
    }

    #[test]
    fn test_keep_alive_header_overrides() {
        let mut req = Request {
            http_version_major: 1,
            http_version_minor: 1,
            headers: vec![Header::new("Connection", "close")],
            ..Default::default()
        };
        assert!(!req.keep_alive());
        req.http_version_minor = 0;
        req.headers = vec![Header::new("Connection", "Keep-Alive")];
        assert!(req.keep_alive());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request {
            headers: vec![Header::new("Host", "x"), Header::new("Host", "y")],
            ..Default::default()
        };
        assert_eq!(req.header("host"), Some("x"));
        assert_eq!(req.header("HOST"), Some("x"));
        assert_eq!(req.header("missing"), None);
    }
}
