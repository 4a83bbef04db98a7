use std::io::{self, ErrorKind, Read};
use std::net::{
    IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use minirpc_common::protocol::error::{MiniRpcError, Result};
use minirpc_common::protocol::{RemoteErrorKind, Response};
use minirpc_common::transport::TcpTransport;
use serde_json::Value;
use socket2::{Domain, Protocol, Socket, Type};

use crate::call::{CallArgs, CallError};
use crate::dispatcher::Dispatcher;

/// Default bind address
pub const DEFAULT_BIND: &str = "localhost:8800";

/// Default bound on request frames (100 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Pending connections queued by the kernel while one is being handled.
pub const LISTEN_BACKLOG: i32 = 5;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the listener to (e.g. "127.0.0.1:8800")
    pub bind: String,
    /// Largest request frame accepted, `None` for no bound
    pub max_message_size: Option<usize>,
}

impl ServerConfig {
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }

    pub fn without_message_limit(mut self) -> Self {
        self.max_message_size = None;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BIND)
    }
}

/// Lifecycle of a server. A server is `Listening` as soon as it is bound;
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Listening,
    Closed,
}

/// Sequential RPC server.
///
/// Accepts one connection at a time and runs exactly one request/response
/// cycle on it before accepting the next. A slow callable or a client that
/// never finishes its request blocks every other client.
///
/// # Example
///
/// ```no_run
/// use minirpc_server::{CallArgs, RpcServer, ServerConfig};
/// use serde_json::json;
///
/// let mut server = RpcServer::bind(ServerConfig::new("127.0.0.1:8800")).unwrap();
/// server.register("add", |args: CallArgs| {
///     let a: i64 = args.arg(0)?;
///     let b: i64 = args.arg(1)?;
///     Ok(json!(a + b))
/// });
/// server.run().unwrap();
/// ```
pub struct RpcServer {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    transport: TcpTransport,
    shutdown: Arc<AtomicBool>,
}

impl RpcServer {
    /// Binds a listener with an empty callable table.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        Self::with_dispatcher(config, Dispatcher::new())
    }

    /// Binds a listener serving an already populated callable table.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the address cannot be bound.
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> Result<Self> {
        let listener = listen(&config.bind, LISTEN_BACKLOG).map_err(|e| {
            MiniRpcError::Connection(format!("Failed to bind to {}: {}", config.bind, e))
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            MiniRpcError::Connection(format!("Failed to get local addr: {}", e))
        })?;

        let transport = match config.max_message_size {
            Some(max) => TcpTransport::new().with_max_message_size(max),
            None => TcpTransport::new(),
        };

        tracing::debug!("Listening on {}", local_addr);

        Ok(Self {
            listener: Some(listener),
            local_addr,
            dispatcher,
            transport,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        if self.listener.is_some() {
            ServerState::Listening
        } else {
            ServerState::Closed
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ServerState::Closed
    }

    /// Registers a callable. See [`Dispatcher::register`].
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(CallArgs) -> std::result::Result<Value, CallError> + Send + Sync + 'static,
    {
        self.dispatcher.register(name, handler);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// A handle that stops [`RpcServer::run`] from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: self.shutdown.clone(),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Runs the accept loop until shut down.
    ///
    /// Each accepted connection is read, dispatched, answered and closed
    /// before the next `accept`. Failures on a connection are logged and
    /// reported to that peer only. When a [`ShutdownHandle`] fires, the loop
    /// exits at the next accept boundary and the server is closed.
    ///
    /// Returns immediately if the server is already closed.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if accepting on the listening socket fails.
    pub fn run(&mut self) -> Result<()> {
        let Some(listener) = self.listener.as_ref() else {
            tracing::debug!("run called on a closed server [{}]", self.local_addr);
            return Ok(());
        };

        tracing::info!("Starting RPC server [{}]", self.local_addr);

        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    tracing::debug!("New connection: {}", peer);
                    handle_connection(&self.dispatcher, &self.transport, stream, peer);
                }
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::warn!("Transient accept failure: {}", e);
                }
                Err(e) => {
                    tracing::error!("Listening socket failed [{}]: {}", self.local_addr, e);
                    return Err(MiniRpcError::Connection(format!(
                        "Failed to accept connection: {}",
                        e
                    )));
                }
            }
        }

        self.close();
        Ok(())
    }

    /// Releases the listening socket. Closing a closed server does nothing.
    pub fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            tracing::info!("Stopping RPC server [{}]", self.local_addr);
            self.shutdown.store(true, Ordering::SeqCst);
            drop(listener);
        }
    }

    /// Asks to go back to `Listening`.
    ///
    /// A listening server stays as it is.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the server has been closed: a closed server cannot
    /// be restarted.
    pub fn reopen(&mut self) -> Result<()> {
        match self.state() {
            ServerState::Listening => Ok(()),
            ServerState::Closed => Err(MiniRpcError::Config("cannot restart a server".to_string())),
        }
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Stops a running [`RpcServer`] from any thread.
///
/// The stop takes effect between connections: a connection being handled is
/// finished first.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("Shutdown requested");

        // Unblock a pending accept; the loop sees the flag and exits.
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::debug!("Wake-up connection to {} failed: {}", self.wake_addr, e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Handle a single connection: one request, one response, then close.
fn handle_connection(
    dispatcher: &Dispatcher,
    transport: &TcpTransport,
    mut stream: TcpStream,
    peer: SocketAddr,
) {
    let mut unread = 0u64;
    let response = match transport.receive_request(&mut stream) {
        Ok(request) => {
            tracing::debug!(
                "[{}]: {}(*{:?}, **{:?})",
                peer,
                request.method,
                request.args,
                request.kwargs
            );
            dispatcher.handle_request(request)
        }
        Err(e) => {
            tracing::warn!("[{}]: Failed to read request: {}", peer, e);
            if let MiniRpcError::MessageTooLarge { size, .. } = &e {
                unread = u64::try_from(*size).unwrap_or(u64::MAX);
            }
            request_failure(&e)
        }
    };

    match &response {
        Response::Result { content } => tracing::debug!("[{}]: {}", peer, content),
        Response::Error { exc_type, message } => {
            tracing::warn!("[{}]: {}: {}", peer, exc_type, message)
        }
    }

    if let Err(e) = TcpTransport::send_response(&mut stream, &response) {
        tracing::warn!("[{}]: Failed to send response: {}", peer, e);
    }

    if unread > 0 {
        // Closing with the rejected payload still queued resets the connection
        // and the peer loses the reply, so read it off first.
        if let Err(e) = stream.shutdown(Shutdown::Write) {
            tracing::debug!("[{}]: Shutdown failed: {}", peer, e);
        }
        match io::copy(&mut (&mut stream).take(unread), &mut io::sink()) {
            Ok(n) => tracing::debug!("[{}]: Discarded {} bytes of rejected payload", peer, n),
            Err(e) => tracing::debug!("[{}]: Failed to discard rejected payload: {}", peer, e),
        }
    }

    if let Err(e) = stream.shutdown(Shutdown::Both) {
        tracing::debug!("[{}]: Shutdown failed: {}", peer, e);
    }
}

/// Binds a listener with a fixed `backlog`, trying each resolved address in turn.
fn listen(addr: &str, backlog: i32) -> io::Result<TcpListener> {
    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs()? {
        match listen_on(socket_addr, backlog) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

fn listen_on(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

fn request_failure(err: &MiniRpcError) -> Response {
    let kind = match err {
        MiniRpcError::MalformedEnvelope(_) | MiniRpcError::MessageTooLarge { .. } => {
            RemoteErrorKind::VALUE_ERROR
        }
        _ => RemoteErrorKind::OS_ERROR,
    };
    Response::error(kind, err.to_string())
}

fn is_transient_accept_error(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Interrupted | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    )
}

/// Address to connect to in order to reach our own listener.
fn wake_addr(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port())
        }
        _ => local,
    }
}
