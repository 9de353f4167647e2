use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use may::coroutine::JoinHandle;
use may::net::TcpStream;
use tracing::{debug, error, info, warn};

use super::request::{decode_request, Request};
use super::response::{encode_reply, Reply, Status};
use crate::handler::RequestHandler;
use crate::runtime_config::RuntimeConfig;

#[derive(Default)]
struct Tracked {
    live: HashMap<u64, JoinHandle<()>>,
    /// Ids whose coroutine finished before `track` ran, so the handle can be
    /// dropped instead of stored.
    finished: HashSet<u64>,
}

/// Bookkeeping for open connections so `stop()` can close them all and join
/// their coroutines deterministically.
pub(crate) struct ConnectionRegistry {
    closing: AtomicBool,
    next_id: AtomicU64,
    tracked: Mutex<Tracked>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            closing: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            tracked: Mutex::new(Tracked::default()),
        }
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record a spawned connection coroutine. If the coroutine already ran to
    /// completion its handle is dropped rather than stored.
    pub(crate) fn track(&self, id: u64, handle: JoinHandle<()>) {
        let mut tracked = self.tracked.lock().unwrap();
        if tracked.finished.remove(&id) {
            return;
        }
        tracked.live.insert(id, handle);
    }

    fn release(&self, id: u64) {
        let mut tracked = self.tracked.lock().unwrap();
        if tracked.live.remove(&id).is_none() {
            tracked.finished.insert(id);
        }
    }

    /// Cancel every live connection coroutine and join it. The lock is not
    /// held across the joins: unwinding coroutines re-enter `release`.
    pub(crate) fn stop_all(&self) {
        let handles: Vec<(u64, JoinHandle<()>)> = {
            let mut tracked = self.tracked.lock().unwrap();
            tracked.live.drain().collect()
        };
        for (_, handle) in &handles {
            // SAFETY: may marks Coroutine::cancel() unsafe. The server is
            // shutting down, the handle is valid, and the coroutine unwinds at
            // its next scheduling point, which is the intended behavior here.
            unsafe {
                handle.coroutine().cancel();
            }
        }
        for (id, handle) in handles {
            if handle.join().is_err() {
                debug!(conn_id = id, "connection coroutine cancelled");
            }
        }
    }
}

/// Removes the connection from the registry however the coroutine exits,
/// including cancellation unwinds.
struct ReleaseGuard {
    registry: Arc<ConnectionRegistry>,
    id: u64,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// Serve one client connection: read, decode, dispatch, write, repeat while
/// keep-alive applies. Runs on its own coroutine.
pub(crate) fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    config: RuntimeConfig,
    registry: Arc<ConnectionRegistry>,
    id: u64,
) {
    let _guard = ReleaseGuard {
        registry: registry.clone(),
        id,
    };
    debug!(peer = %peer, conn_id = id, "connection accepted");

    let mut buf = BytesMut::with_capacity(4096);
    let mut chunk = [0u8; 8192];
    loop {
        if registry.is_closing() {
            break;
        }
        let request = match decode_request(&mut buf, &config) {
            Ok(Some(request)) => request,
            Ok(None) => match stream.read(&mut chunk) {
                Ok(0) => {
                    if !buf.is_empty() {
                        debug!(peer = %peer, "connection closed mid-request");
                    }
                    break;
                }
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    continue;
                }
                Err(e) => {
                    debug!(peer = %peer, error = %e, "read failed");
                    break;
                }
            },
            Err(e) => {
                // Parse errors never reach the handler; answer 400 and close.
                warn!(peer = %peer, error = %e, "rejecting malformed request");
                let reply = Reply::stock(Status::BadRequest);
                if let Err(e) = stream.write_all(&encode_reply(&reply, (1, 1), true)) {
                    debug!(peer = %peer, error = %e, "write failed");
                }
                break;
            }
        };

        if registry.is_closing() {
            break;
        }
        let mut reply = Reply::default();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            handler.handle_request(&request, &mut reply)
        }));
        if let Err(panic) = outcome {
            error!(
                peer = %peer,
                method = %request.method,
                uri = %request.uri,
                panic = ?panic,
                "handler panicked"
            );
            reply = Reply::stock(Status::InternalServerError);
        }

        let keep = request.keep_alive() && !reply.requests_close() && !registry.is_closing();
        let version = (request.http_version_major, request.http_version_minor);
        if let Err(e) = stream.write_all(&encode_reply(&reply, version, !keep)) {
            debug!(peer = %peer, error = %e, "write failed");
            break;
        }
        info!(
            peer = %peer,
            method = %request.method,
            uri = %request.uri,
            status = reply.status.code(),
            "request handled"
        );
        if !keep {
            break;
        }
    }
    debug!(peer = %peer, conn_id = id, "connection closed");
}
