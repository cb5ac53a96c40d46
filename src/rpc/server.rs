//! Connection manager: TCP listener, live client set and reactor loop.
//!
//! All socket events (new connection, data available, disconnect) are
//! funnelled into one `select!` loop and processed sequentially, so the live
//! client set and each connection's read buffer need no locking. Reader
//! tasks do nothing but forward raw byte chunks into the loop's channel;
//! every state mutation happens here.
//!
//! Per connection the flow is: append bytes to the buffer, drain every
//! complete newline-terminated segment, trim it, and hand non-empty lines to
//! the parser → dispatcher → formatter pipeline. Responses are queued to a
//! per-connection writer task, one message per input line, in order; the
//! loop itself never awaits a socket write, so a peer that stops reading
//! cannot stall the other connections. A trailing partial segment stays
//! buffered for the next read; a connection that buffers more than the
//! configured limit without a newline, or whose outbound queue fills up,
//! is dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::events::SharedObserver;
use crate::host::ActionHost;
use crate::rpc::dispatch::Dispatcher;
use crate::rpc::parser::parse_line;

/// Read chunk size for connection reader tasks.
const READ_CHUNK: usize = 4096;

/// Capacity of the reactor's connection-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Maximum responses queued towards one client before it is dropped.
const OUTBOUND_QUEUE_LINES: usize = 64;

/// Events forwarded from reader tasks into the reactor loop.
enum ConnEvent {
    /// Bytes arrived on the identified connection.
    Data(u64, Vec<u8>),
    /// The identified connection reached EOF or failed to read.
    Closed(u64),
}

/// One live client connection, owned exclusively by the reactor loop.
///
/// The write half lives inside a dedicated writer task; the loop only ever
/// queues onto `outbound` without awaiting.
struct ClientConnection {
    addr: String,
    outbound: mpsc::Sender<String>,
    buf: Vec<u8>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// What the reactor loop should do next.
enum Tick {
    Shutdown,
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Conn(ConnEvent),
}

/// Handle for asking a running server to stop from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<Notify>);

impl ShutdownHandle {
    /// Makes the server's `run()` loop stop and return. A signal sent before
    /// the loop is polling is not lost.
    pub fn signal(&self) {
        self.0.notify_one();
    }
}

/// The TCP remote-control server.
pub struct ControlServer<H: ActionHost> {
    dispatcher: Dispatcher<H>,
    observer: SharedObserver,
    bind_address: String,
    max_line_bytes: usize,
    listener: Option<TcpListener>,
    bound_port: Option<u16>,
    clients: HashMap<u64, ClientConnection>,
    next_conn_id: u64,
    events_tx: mpsc::Sender<ConnEvent>,
    events_rx: mpsc::Receiver<ConnEvent>,
    shutdown: Arc<Notify>,
}

impl<H: ActionHost> ControlServer<H> {
    /// Creates a server around the given host and observer.
    pub fn new(host: H, observer: SharedObserver, config: &ServerConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            dispatcher: Dispatcher::new(host, Arc::clone(&observer)),
            observer,
            bind_address: config.bind_address.clone(),
            max_line_bytes: config.max_line_bytes,
            listener: None,
            bound_port: None,
            clients: HashMap::new(),
            next_conn_id: 0,
            events_tx,
            events_rx,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Binds the listening socket.
    ///
    /// Idempotent: a server that is already listening reports success with
    /// its existing port. Emits the `server_started` lifecycle event on a
    /// fresh bind.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be bound. This is
    /// the only hard startup failure.
    pub async fn start(&mut self, port: u16) -> Result<u16, ServerError> {
        if let Some(existing) = self.bound_port {
            tracing::debug!(port = existing, "server already listening");
            return Ok(existing);
        }

        let listener = TcpListener::bind((self.bind_address.as_str(), port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        let bound = listener.local_addr()?.port();

        self.listener = Some(listener);
        self.bound_port = Some(bound);

        tracing::info!(address = %self.bind_address, port = bound, "server listening");
        self.observer.server_started(bound);

        Ok(bound)
    }

    /// Runs the reactor loop until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotStarted`] if called before [`Self::start`].
    pub async fn run(&mut self) -> Result<(), ServerError> {
        if self.listener.is_none() {
            return Err(ServerError::NotStarted);
        }

        loop {
            let shutdown = Arc::clone(&self.shutdown);
            let tick = tokio::select! {
                () = shutdown.notified() => Tick::Shutdown,
                accepted = Self::accept_or_pending(self.listener.as_ref()) => {
                    Tick::Accepted(accepted)
                }
                event = self.events_rx.recv() => match event {
                    Some(e) => Tick::Conn(e),
                    // Unreachable while the server holds a sender; treat a
                    // closed channel like a shutdown request.
                    None => Tick::Shutdown,
                },
            };

            match tick {
                Tick::Shutdown => {
                    self.stop().await;
                    return Ok(());
                }
                Tick::Accepted(Ok((stream, addr))) => self.register_client(stream, addr),
                Tick::Accepted(Err(e)) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                }
                Tick::Conn(ConnEvent::Data(id, bytes)) => self.handle_data(id, &bytes),
                Tick::Conn(ConnEvent::Closed(id)) => self.remove_client(id),
            }
        }
    }

    /// Stops the server: closes every live connection best-effort, clears
    /// the live set and drops the listening socket.
    ///
    /// Idempotent: calling on an already-stopped server is a no-op and emits
    /// no duplicate `server_stopped` event.
    pub async fn stop(&mut self) {
        if self.listener.take().is_none() {
            return;
        }
        self.bound_port = None;

        for (_, conn) in self.clients.drain() {
            conn.reader.abort();
            conn.writer.abort();
            // Wait for teardown so the sockets are closed by the time the
            // stopped event fires. Aborted tasks report a join error.
            let _ = conn.reader.await;
            let _ = conn.writer.await;
        }

        tracing::info!("server stopped");
        self.observer.server_stopped();
    }

    /// Whether the listening socket is currently bound.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// The bound port, if the server is running.
    #[must_use]
    pub const fn local_port(&self) -> Option<u16> {
        self.bound_port
    }

    /// Number of live client connections.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Returns a handle that makes [`Self::run`] stop and return.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    async fn accept_or_pending(
        listener: Option<&TcpListener>,
    ) -> std::io::Result<(TcpStream, SocketAddr)> {
        match listener {
            Some(l) => l.accept().await,
            None => std::future::pending().await,
        }
    }

    /// Registers an accepted connection and spawns its reader and writer
    /// tasks.
    fn register_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_conn_id;
        self.next_conn_id += 1;

        let (mut read_half, mut write_half) = stream.into_split();
        let tx = self.events_tx.clone();
        let reader = tokio::spawn(async move {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match read_half.read(&mut chunk).await {
                    Ok(0) => {
                        let _ = tx.send(ConnEvent::Closed(id)).await;
                        return;
                    }
                    Ok(n) => {
                        if tx.send(ConnEvent::Data(id, chunk[..n].to_vec())).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(conn = id, error = %e, "read failed");
                        let _ = tx.send(ConnEvent::Closed(id)).await;
                        return;
                    }
                }
            }
        });

        let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_LINES);
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = write_half.write_all(message.as_bytes()).await {
                    // A disconnected peer cannot receive a response; the
                    // reader side reports the close.
                    tracing::debug!(conn = id, error = %e, "response write failed");
                    return;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let address = addr.to_string();
        self.clients.insert(
            id,
            ClientConnection {
                addr: address.clone(),
                outbound,
                buf: Vec::new(),
                reader,
                writer,
            },
        );

        tracing::info!(client = %address, "client connected");
        self.observer.client_connected(&address);
    }

    /// Appends bytes to the connection's buffer and processes every complete
    /// line currently available.
    fn handle_data(&mut self, id: u64, bytes: &[u8]) {
        // The connection may have been removed while the event was in flight.
        let Some(conn) = self.clients.get_mut(&id) else {
            return;
        };
        conn.buf.extend_from_slice(bytes);

        while let Some(pos) = conn.buf.iter().position(|&b| b == b'\n') {
            let segment: Vec<u8> = conn.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&segment[..pos])
                .trim()
                .to_string();
            if line.is_empty() {
                continue;
            }

            tracing::debug!(client = %conn.addr, line = %line, "request");
            let cmd = parse_line(&line);
            let (mut response, _success) = self.dispatcher.dispatch(&cmd);
            response.push('\n');

            match conn.outbound.try_send(response) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        client = %conn.addr,
                        limit = OUTBOUND_QUEUE_LINES,
                        "outbound queue limit exceeded, dropping client"
                    );
                    self.remove_client(id);
                    return;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // The writer task exited on a failed write; the peer is
                    // gone.
                    self.remove_client(id);
                    return;
                }
            }
        }

        if conn.buf.len() > self.max_line_bytes {
            let addr = conn.addr.clone();
            tracing::warn!(
                client = %addr,
                limit = self.max_line_bytes,
                "line buffer limit exceeded, dropping client"
            );
            self.remove_client(id);
        }
    }

    /// Removes a connection from the live set and releases its resources.
    fn remove_client(&mut self, id: u64) {
        if let Some(conn) = self.clients.remove(&id) {
            conn.reader.abort();
            conn.writer.abort();
            tracing::info!(client = %conn.addr, "client disconnected");
            self.observer.client_disconnected(&conn.addr);
        }
    }
}
