use std::io;
use std::net::{SocketAddr, TcpStream as StdTcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use may::coroutine::{self, JoinHandle};
use may::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::connection::{serve_connection, ConnectionRegistry};
use crate::handler::RequestHandler;
use crate::runtime_config::RuntimeConfig;

/// Embeddable HTTP/1.x server.
///
/// Bound permanently to one [`RequestHandler`] at construction. `start` runs
/// the accept loop on a background coroutine and returns immediately; `stop`
/// shuts everything down and joins it before returning. Both are idempotent.
///
/// ```no_run
/// use std::sync::Arc;
/// use embedhttp::{HttpServer, Reply, Request, Status};
///
/// let mut server = HttpServer::new(Arc::new(|_req: &Request, reply: &mut Reply| {
///     *reply = Reply::with_text(Status::Ok, "hello");
/// }));
/// server.start("127.0.0.1", "8080").unwrap();
/// // ... embedding application does its work ...
/// server.stop();
/// ```
pub struct HttpServer {
    handler: Arc<dyn RequestHandler>,
    config: RuntimeConfig,
    handle: Option<ServerHandle>,
}

/// Handle to a running accept loop.
///
/// Owned by [`HttpServer`] while the server runs; `stop` cancels the accept
/// coroutine, closes every open connection and joins them all.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    registry: Arc<ConnectionRegistry>,
}

impl ServerHandle {
    /// The address the listener is actually bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to accept connections, by polling with plain TCP
    /// connects. Useful in tests right after `start`.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the listener is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if StdTcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop the server: no new connections are accepted, open connections are
    /// cancelled and joined. When this returns, no handler invocation is in
    /// flight or will happen again.
    pub fn stop(self) {
        self.registry.begin_close();
        // SAFETY: may marks Coroutine::cancel() unsafe. We hold a valid
        // handle, the server is shutting down, and cancelling the blocked
        // accept is the intended way to unwind the loop.
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            debug!("accept coroutine exited by cancellation");
        }
        self.registry.stop_all();
    }

    /// Block until the accept loop exits on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept coroutine panicked or was cancelled.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl HttpServer {
    /// Create a server bound to `handler`, with configuration from the
    /// environment (see [`RuntimeConfig::from_env`]).
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self::with_config(handler, RuntimeConfig::from_env())
    }

    /// Create a server with an explicit [`RuntimeConfig`].
    pub fn with_config(handler: Arc<dyn RequestHandler>, config: RuntimeConfig) -> Self {
        Self {
            handler,
            config,
            handle: None,
        }
    }

    /// Start listening on `address:port` and serve on a background coroutine.
    ///
    /// Binding happens synchronously, so bind and listen failures (address in
    /// use, invalid address or port) are reported here and the server stays
    /// stopped. Calling `start` while already running is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an unparsable port or unresolvable address, plus any
    /// bind error from the OS.
    pub fn start(&mut self, address: &str, port: &str) -> io::Result<()> {
        if self.handle.is_some() {
            debug!("start called while running, ignoring");
            return Ok(());
        }
        let port: u16 = port.parse().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid port: {port}"))
        })?;
        let addr = (address, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve")
        })?;

        let listener = TcpListener::bind(addr)?;
        let local = listener.local_addr()?;
        let registry = Arc::new(ConnectionRegistry::new());

        let handler = self.handler.clone();
        let config = self.config;
        let loop_registry = registry.clone();
        // SAFETY: may marks Builder::spawn() unsafe because of the coroutine
        // runtime's requirements, not this closure's logic. The closure is
        // Send + 'static and owns everything it touches.
        let handle = unsafe {
            coroutine::Builder::new()
                .stack_size(config.stack_size)
                .spawn(move || accept_loop(listener, handler, config, loop_registry))
        }?;

        info!(address = %local, "http server listening");
        self.handle = Some(ServerHandle {
            addr: local,
            handle,
            registry,
        });
        Ok(())
    }

    /// Stop the server and join its coroutines. No-op when not running; after
    /// this returns it is safe to drop the handler.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
            info!("http server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(ServerHandle::local_addr)
    }

    /// Poll until the listener accepts connections. See
    /// [`ServerHandle::wait_ready`].
    ///
    /// # Errors
    ///
    /// `NotConnected` when the server is not running, `TimedOut` when the
    /// listener does not come up.
    pub fn wait_ready(&self) -> io::Result<()> {
        match &self.handle {
            Some(handle) => handle.wait_ready(),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "server not started",
            )),
        }
    }

    /// Block the calling thread until the accept loop exits on its own.
    pub fn block_until_finished(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("server coroutine exited by cancellation");
            }
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Accept connections until cancelled, spawning one coroutine per connection.
fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    config: RuntimeConfig,
    registry: Arc<ConnectionRegistry>,
) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) => {
                if registry.is_closing() {
                    break;
                }
                warn!(error = %e, "accept failed");
                // Also a cancellation point if the error is persistent.
                coroutine::sleep(Duration::from_millis(10));
                continue;
            }
        };
        if registry.is_closing() {
            break;
        }

        let id = registry.next_id();
        let conn_handler = handler.clone();
        let conn_registry = registry.clone();
        // SAFETY: same justification as the accept coroutine spawn above.
        let spawned = unsafe {
            coroutine::Builder::new()
                .stack_size(config.stack_size)
                .spawn(move || {
                    serve_connection(stream, peer, conn_handler, config, conn_registry, id)
                })
        };
        match spawned {
            Ok(handle) => registry.track(id, handle),
            Err(e) => error!(error = %e, "failed to spawn connection coroutine"),
        }
    }
}
