//! TCP command server for driving a controller remotely.
//!
//! [`CommandServer`] listens for a single client and feeds its
//! newline-delimited commands to an [`EpisodicController`]. A command that
//! fails is fatal to that command only; the connection closing shuts the
//! controller down and ends the serve loop.

use crate::command::Command;
use crate::controller::{ControllerError, EpisodicController, PhaseDevice};
use std::io::{self, BufRead, BufReader};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

/// Errors that can end a serve loop.
#[derive(Debug)]
pub enum ServerError {
    /// Socket setup or read failed.
    Io(io::Error),
    /// Controller shutdown at end of connection failed.
    Controller(ControllerError),
}

impl core::fmt::Display for ServerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "server i/o error: {e}"),
            ServerError::Controller(e) => write!(f, "controller error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Io(e) => Some(e),
            ServerError::Controller(e) => Some(e),
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(e: io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<ControllerError> for ServerError {
    fn from(e: ControllerError) -> Self {
        ServerError::Controller(e)
    }
}

/// Listens for one command client and dispatches its commands.
pub struct CommandServer {
    listener: TcpListener,
    name: String,
}

impl CommandServer {
    /// Binds the listening socket.
    ///
    /// `name` identifies this server in log output.
    pub fn bind(addr: impl ToSocketAddrs, name: impl Into<String>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let name = name.into();
        log::info!("{} server listening on {}", name, listener.local_addr()?);
        Ok(Self { listener, name })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts one client and serves its commands until it disconnects.
    ///
    /// Each line is parsed as a [`Command`] and applied to `controller`. Bad
    /// input and failed control calls are logged and do not end the loop.
    /// When the client disconnects the controller is terminated and the loop
    /// returns, so a served controller is fully shut down afterwards.
    pub fn serve<D: PhaseDevice>(
        &self,
        controller: &mut EpisodicController<D>,
    ) -> Result<(), ServerError> {
        let (stream, peer) = self.listener.accept()?;
        log::info!("{}: connection from {}", self.name, peer);

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    log::warn!("{}: bad command: {}", self.name, e);
                    continue;
                }
            };

            let applied = match command {
                Command::Start => controller.begin_episode(),
                Command::Stop => controller.end_episode(),
                Command::Rate(half_cycle) => controller.set_half_cycle(half_cycle),
            };
            if let Err(e) = applied {
                log::error!("{}: {:?} failed: {}", self.name, command, e);
            }
        }

        log::info!("{}: client disconnected, shutting down", self.name);
        match controller.terminate() {
            Ok(()) | Err(ControllerError::AlreadyTerminated) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
