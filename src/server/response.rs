use bytes::{BufMut, BytesMut};

use super::request::Header;

/// The fixed set of status codes a [`Reply`] can carry, named symbolically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Created,
    Accepted,
    NoContent,
    MultipleChoices,
    MovedPermanently,
    MovedTemporarily,
    NotModified,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
}

impl Status {
    /// Every enumerated status, in numeric order.
    pub const ALL: [Status; 16] = [
        Status::Ok,
        Status::Created,
        Status::Accepted,
        Status::NoContent,
        Status::MultipleChoices,
        Status::MovedPermanently,
        Status::MovedTemporarily,
        Status::NotModified,
        Status::BadRequest,
        Status::Unauthorized,
        Status::Forbidden,
        Status::NotFound,
        Status::InternalServerError,
        Status::NotImplemented,
        Status::BadGateway,
        Status::ServiceUnavailable,
    ];

    /// Numeric status code sent on the status line.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::Accepted => 202,
            Status::NoContent => 204,
            Status::MultipleChoices => 300,
            Status::MovedPermanently => 301,
            Status::MovedTemporarily => 302,
            Status::NotModified => 304,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
            Status::BadGateway => 502,
            Status::ServiceUnavailable => 503,
        }
    }

    /// Canonical reason phrase for the status line.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::Accepted => "Accepted",
            Status::NoContent => "No Content",
            Status::MultipleChoices => "Multiple Choices",
            Status::MovedPermanently => "Moved Permanently",
            Status::MovedTemporarily => "Moved Temporarily",
            Status::NotModified => "Not Modified",
            Status::BadRequest => "Bad Request",
            Status::Unauthorized => "Unauthorized",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
            Status::BadGateway => "Bad Gateway",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Canned HTML body used by [`Reply::stock`]. 200 OK deliberately has an
    /// empty body; every other status gets a short descriptive page.
    fn stock_body(self) -> &'static str {
        match self {
            Status::Ok => "",
            Status::Created => {
                "<html><head><title>Created</title></head><body><h1>201 Created</h1></body></html>"
            }
            Status::Accepted => {
                "<html><head><title>Accepted</title></head><body><h1>202 Accepted</h1></body></html>"
            }
            Status::NoContent => {
                "<html><head><title>No Content</title></head><body><h1>204 No Content</h1></body></html>"
            }
            Status::MultipleChoices => {
                "<html><head><title>Multiple Choices</title></head><body><h1>300 Multiple Choices</h1></body></html>"
            }
            Status::MovedPermanently => {
                "<html><head><title>Moved Permanently</title></head><body><h1>301 Moved Permanently</h1></body></html>"
            }
            Status::MovedTemporarily => {
                "<html><head><title>Moved Temporarily</title></head><body><h1>302 Moved Temporarily</h1></body></html>"
            }
            Status::NotModified => {
                "<html><head><title>Not Modified</title></head><body><h1>304 Not Modified</h1></body></html>"
            }
            Status::BadRequest => {
                "<html><head><title>Bad Request</title></head><body><h1>400 Bad Request</h1></body></html>"
            }
            Status::Unauthorized => {
                "<html><head><title>Unauthorized</title></head><body><h1>401 Unauthorized</h1></body></html>"
            }
            Status::Forbidden => {
                "<html><head><title>Forbidden</title></head><body><h1>403 Forbidden</h1></body></html>"
            }
            Status::NotFound => {
                "<html><head><title>Not Found</title></head><body><h1>404 Not Found</h1></body></html>"
            }
            Status::InternalServerError => {
                "<html><head><title>Internal Server Error</title></head><body><h1>500 Internal Server Error</h1></body></html>"
            }
            Status::NotImplemented => {
                "<html><head><title>Not Implemented</title></head><body><h1>501 Not Implemented</h1></body></html>"
            }
            Status::BadGateway => {
                "<html><head><title>Bad Gateway</title></head><body><h1>502 Bad Gateway</h1></body></html>"
            }
            Status::ServiceUnavailable => {
                "<html><head><title>Service Unavailable</title></head><body><h1>503 Service Unavailable</h1></body></html>"
            }
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// The response a [`RequestHandler`] fills in.
///
/// Created default by the server before each handler invocation, serialized
/// and discarded after the response has been written. The server recomputes
/// `Content-Length` from `content` at serialization time, so handlers never
/// need to set it themselves.
///
/// [`RequestHandler`]: crate::handler::RequestHandler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub headers: Vec<Header>,
    pub content: Vec<u8>,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: Status::Ok,
            headers: Vec::new(),
            content: Vec::new(),
        }
    }
}

impl Reply {
    /// Canned reply for the given status: deterministic HTML body plus
    /// `Content-Length` and `Content-Type` headers. Used by the server for
    /// error paths and available to handlers wanting a quick response.
    pub fn stock(status: Status) -> Self {
        let content = status.stock_body().as_bytes().to_vec();
        Self {
            status,
            headers: vec![
                Header::new("Content-Length", content.len().to_string()),
                Header::new("Content-Type", "text/html"),
            ],
            content,
        }
    }

    /// Plain-text reply with the given status.
    pub fn with_text(status: Status, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![Header::new("Content-Type", "text/plain")],
            content: text.into().into_bytes(),
        }
    }

    /// Append a header, keeping encounter order.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Whether the handler asked for the connection to be closed via an
    /// explicit `Connection: close` header.
    pub(crate) fn requests_close(&self) -> bool {
        self.headers.iter().any(|h| {
            h.name.eq_ignore_ascii_case("connection") && h.value.eq_ignore_ascii_case("close")
        })
    }

    fn has_connection_header(&self) -> bool {
        self.headers
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case("connection"))
    }
}

/// Serialize a reply for the wire.
///
/// The status line echoes the request's HTTP version. `Content-Length` is
/// always the length of `content`, overriding any handler-set value, and a
/// `Connection: close` header is added when the server intends to close the
/// connection and the handler did not set one itself.
pub(crate) fn encode_reply(reply: &Reply, version: (u8, u8), close: bool) -> BytesMut {
    let mut out = BytesMut::with_capacity(256 + reply.content.len());
    out.put_slice(
        format!(
            "HTTP/{}.{} {} {}\r\n",
            version.0,
            version.1,
            reply.status.code(),
            reply.status.reason()
        )
        .as_bytes(),
    );
    for h in &reply.headers {
        if h.name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        out.put_slice(h.name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(h.value.as_bytes());
        out.put_slice(b"\r\n");
    }
    out.put_slice(format!("Content-Length: {}\r\n", reply.content.len()).as_bytes());
    if close && !reply.has_connection_header() {
        out.put_slice(b"Connection: close\r\n");
    }
    out.put_slice(b"\r\n");
    out.put_slice(&reply.content);
    out
}
