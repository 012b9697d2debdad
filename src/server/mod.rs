//! # Viewer Endpoint
//!
//! TCP endpoint carrying the push, command and query channels.
//!
//! Each connection gets its own broadcast receiver and is served by one task
//! that interleaves pushed events with responses to the viewer's requests.
//! A viewer that stops reading only lags its own receiver; missed events are
//! dropped for that viewer and the sampling loop never waits on it.

pub mod protocol;

use serde::Serialize;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::{Result, VarioError};
use crate::flight::RecordId;
use crate::telemetry::TelemetryHub;

pub use protocol::{Request, Response};

/// Answer a single viewer request against the hub
pub fn handle_request(hub: &TelemetryHub, request: Request) -> Response {
    match request {
        Request::StartFlight => {
            hub.start_flight();
            Response::Ack
        }
        Request::StopFlight => match hub.stop_flight() {
            Ok(_) => Response::Ack,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Request::GetCurrent => Response::Current { reading: hub.latest() },
        Request::ListFlights => match hub.archive().list() {
            Ok(ids) => Response::Flights { ids },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Request::GetFlight { id } => match parse_id(&id).and_then(|id| hub.archive().get(&id)) {
            Ok(record) => Response::Flight { record },
            Err(e) => error_response(id, e),
        },
        Request::DeleteFlight { id } => match parse_id(&id).and_then(|id| hub.archive().delete(&id)) {
            Ok(()) => Response::Deleted { success: true },
            Err(e) => error_response(id, e),
        },
    }
}

fn parse_id(id: &str) -> Result<RecordId> {
    id.parse()
}

fn error_response(id: String, error: VarioError) -> Response {
    match error {
        VarioError::NotFound(_) => Response::NotFound { id },
        other => Response::Error { message: other.to_string() },
    }
}

/// Listening socket for viewers
pub struct ViewerServer {
    listener: TcpListener,
    hub: TelemetryHub,
}

impl ViewerServer {
    /// Bind the endpoint
    ///
    /// # Errors
    ///
    /// Returns `Io` if the address cannot be bound
    pub async fn bind(addr: &str, hub: TelemetryHub) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept viewers until the listener fails
    ///
    /// # Errors
    ///
    /// Returns `Io` if accepting a connection fails
    pub async fn serve(self) -> Result<()> {
        info!("Viewer endpoint listening on {}", self.local_addr()?);

        loop {
            let (socket, peer) = self.listener.accept().await?;
            let hub = self.hub.clone();

            tokio::spawn(async move {
                info!("Viewer connected: {}", peer);
                match handle_connection(socket, &hub).await {
                    Ok(()) => info!("Viewer disconnected: {}", peer),
                    Err(e)
                        if matches!(
                            e.kind(),
                            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
                        ) =>
                    {
                        info!("Viewer disconnected: {}", peer)
                    }
                    Err(e) => warn!("Closing connection to {} due to {}", peer, e),
                }
            });
        }
    }
}

async fn handle_connection(socket: TcpStream, hub: &TelemetryHub) -> io::Result<()> {
    let mut events = hub.subscribe();
    let (rx, mut tx) = socket.into_split();
    let mut lines = BufReader::new(rx).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => {
                        debug!("Viewer request: {:?}", request);
                        handle_request(hub, request)
                    }
                    Err(e) => Response::Error { message: format!("Invalid request: {}", e) },
                };
                write_message(&mut tx, &response).await?;
            }

            event = events.recv() => match event {
                Ok(event) => write_message(&mut tx, &event).await?,
                Err(RecvError::Lagged(missed)) => {
                    debug!("Viewer lagging, dropped {} events", missed);
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn write_message<T: Serialize>(tx: &mut OwnedWriteHalf, message: &T) -> io::Result<()> {
    let mut buffer = serde_json::to_vec(message)?;
    buffer.push(b'\n');
    tx.write_all(&buffer).await
}
