use crate::server::request::Request;
use crate::server::response::Reply;

/// The capability the embedding application supplies to [`HttpServer`].
///
/// The server is bound to exactly one handler for its whole lifetime and
/// invokes it synchronously on its worker context, once per successfully
/// parsed request. Handlers fill in the `reply` and return; they must not
/// retain the request or reply beyond the call (the borrows enforce this),
/// and they should return promptly since a long-running handler stalls the
/// connection it runs on.
///
/// Panics inside a handler are caught by the server: the connection gets a
/// `500 Internal Server Error` stock reply and other connections are
/// unaffected.
///
/// [`HttpServer`]: crate::server::HttpServer
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, request: &Request, reply: &mut Reply);
}

/// Plain functions and closures can serve as handlers directly.
impl<F> RequestHandler for F
where
    F: Fn(&Request, &mut Reply) + Send + Sync,
{
    fn handle_request(&self, request: &Request, reply: &mut Reply) {
        self(request, reply)
    }
}
