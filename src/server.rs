//! TCP server: socket setup, the single accept, and resource teardown.
//!
//! Binds one listening socket, accepts exactly one client, hands the
//! connection to the session loop, then releases every resource
//! regardless of how the session ended. There is no accept loop;
//! connections queued behind the first are never served.

use crate::config::Config;
use crate::session::{Session, SessionError};
use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Fatal server failures.
#[derive(Debug)]
pub enum ServeError {
    /// Accepting the one client failed.
    Accept(io::Error),
    /// Duplicating the client stream into reader/writer handles failed.
    Split(io::Error),
    /// The session ended on a fatal error.
    Session(SessionError),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Accept(e) => write!(f, "Failed to accept a connection: {}", e),
            ServeError::Split(e) => write!(f, "Failed to clone the client stream: {}", e),
            ServeError::Session(e) => write!(f, "Session ended with a fatal error: {}", e),
        }
    }
}

impl std::error::Error for ServeError {}

/// Server instance owning the listening socket and the one session.
pub struct Server {
    listener: TcpListener,
    session: Session,
}

impl Server {
    /// Bind the listening socket described by `config`.
    ///
    /// Fails on any bind error; there is no retry.
    pub fn bind(config: &Config) -> io::Result<Server> {
        let addr: SocketAddr = config.listen.parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid listen address '{}': {}", config.listen, e),
            )
        })?;

        let listener = create_listener(addr, config.backlog)?;
        let local = listener.local_addr()?;
        let mut session = Session::new(config.iterations(), config.pause());
        session.listening();

        info!(address = %local, backlog = config.backlog, "Server listening");

        Ok(Server { listener, session })
    }

    /// Address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one client and run the session to completion.
    ///
    /// Every resource has a close attempted exactly once, on success
    /// and on failure alike; the first fatal error is returned after
    /// teardown is done.
    pub fn serve(mut self) -> Result<(), ServeError> {
        info!("Waiting (blocking) for a connection request");

        let outcome = match self.listener.accept() {
            Ok((stream, peer)) => {
                self.session.connected();
                debug!(peer = %peer, "New connection");

                let outcome = run_connection(&stream, &mut self.session);
                close_client(stream);
                outcome
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                Err(ServeError::Accept(e))
            }
        };

        if let Err(e) = &outcome {
            error!(error = %e, "Server run failed");
        }

        info!("Session over, closing the listening socket");
        drop(self.listener);
        self.session.closed();

        outcome
    }
}

/// Split the client stream into buffered handles and run the session.
///
/// The reader and writer wrap independent clones of the stream, so each
/// one is a distinct closable resource. Both are closed here, each on
/// its own, before the socket itself is shut down by the caller.
fn run_connection(stream: &TcpStream, session: &mut Session) -> Result<(), ServeError> {
    let mut reader = BufReader::new(stream.try_clone().map_err(ServeError::Split)?);
    let mut writer = BufWriter::new(stream.try_clone().map_err(ServeError::Split)?);

    let outcome = session
        .run(&mut reader, &mut writer)
        .map_err(ServeError::Session);

    if let Err(e) = writer.flush() {
        warn!(error = %e, "Failed to flush writer during teardown");
    }
    drop(writer);
    drop(reader);

    outcome
}

/// Best-effort close of the client socket.
fn close_client(stream: TcpStream) {
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        warn!(error = %e, "Failed to shut down client socket");
    }
    drop(stream);
}

/// Create a blocking TCP listener with an explicit backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}
