//! # embedhttp
//!
//! A minimal embeddable HTTP/1.x server with a synchronous request/reply
//! callback interface, powered by the [`may`] coroutine runtime.
//!
//! The embedding application implements [`RequestHandler`], hands it to an
//! [`HttpServer`], and calls [`HttpServer::start`]. The accept loop runs on a
//! background coroutine so `start` returns immediately; each connection gets
//! its own coroutine, so a slow client never starves the others and the
//! embedder's thread never blocks on network I/O. [`HttpServer::stop`] tears
//! everything down deterministically: once it returns, no handler invocation
//! is in flight or will occur again.
//!
//! ## Modules
//!
//! - **[`server`]** - the server itself plus the [`Request`]/[`Reply`] types
//! - **[`handler`]** - the [`RequestHandler`] trait implemented by the host
//! - **[`uri`]** - percent-decoding and query-string splitting helpers
//! - **[`runtime_config`]** - environment-driven coroutine and size limits
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use embedhttp::{HttpServer, Reply, Request, Status};
//!
//! let mut server = HttpServer::new(Arc::new(|req: &Request, reply: &mut Reply| {
//!     let (resource, _params) = embedhttp::uri::split_uri(&req.uri);
//!     match resource.as_str() {
//!         "/hello" => *reply = Reply::with_text(Status::Ok, "hi"),
//!         _ => *reply = Reply::stock(Status::NotFound),
//!     }
//! }));
//! server.start("127.0.0.1", "8080")?;
//! server.block_until_finished();
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Scope
//!
//! HTTP/1.0 and HTTP/1.1 framing with `Content-Length` bodies and
//! protocol-default keep-alive. No TLS, no chunked transfer decoding, no
//! routing; those belong to the embedding application or a proxy in front.

pub mod handler;
pub mod runtime_config;
pub mod server;
pub mod uri;

pub use handler::RequestHandler;
pub use runtime_config::RuntimeConfig;
pub use server::{Header, HttpServer, Reply, Request, ServerHandle, Status};
