//! Line-oriented SQL console.
//!
//! Each request is one line of SQL; each response is one line of JSON:
//! `{"ok":true,"rows":[...]}` or
//! `{"ok":false,"error":{"kind":"...","message":"...","retryable":false}}`.
//! Errors never close the connection, except an over-long line.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, EngineError, ErrorKind};
use crate::limits::MAX_LINE_LEN;
use crate::observability::{self, command_label};
use crate::sql::{Command, SqlError, parse_sql};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn rows(rows: Vec<JsonValue>) -> Self {
        Self {
            ok: true,
            rows: Some(rows),
            error: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            ok: false,
            rows: None,
            error: Some(ErrorBody {
                kind: kind.label().to_string(),
                message: message.into(),
                retryable,
            }),
        }
    }

    fn from_engine_error(e: &EngineError) -> Self {
        Self::error(e.kind(), e.to_string(), e.is_retryable())
    }

    fn from_sql_error(e: &SqlError) -> Self {
        Self::error(ErrorKind::Validation, e.to_string(), false)
    }
}

fn to_rows<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<Vec<JsonValue>, EngineError> {
    items
        .into_iter()
        .map(|item| {
            serde_json::to_value(item)
                .map_err(|e| EngineError::Storage(format!("encoding result: {e}")))
        })
        .collect()
}

/// Run one command against the engine.
pub async fn execute(engine: &Engine, cmd: &Command) -> Result<Vec<JsonValue>, EngineError> {
    match cmd {
        Command::InsertHotel(draft) => to_rows([engine.register_hotel(draft.clone()).await?]),
        Command::SetRoomCapacity { hotel_id, entries } => {
            to_rows(engine.set_room_capacity(*hotel_id, entries.clone()).await?)
        }
        Command::InsertReservation(req) => to_rows([engine.create_reservation(req.clone()).await?]),
        Command::ReserveCapacity {
            hotel_id,
            size,
            quantity,
        } => to_rows([engine.reserve_capacity(*hotel_id, *size, *quantity).await?]),
        Command::ReleaseCapacity {
            hotel_id,
            size,
            quantity,
        } => to_rows([engine.release_capacity(*hotel_id, *size, *quantity).await?]),
        Command::AddExtraRoom {
            reservation_id,
            quantity,
        } => to_rows([engine.add_extra_room(*reservation_id, *quantity).await?]),
        Command::CancelReservation { reservation_id } => {
            to_rows([engine.cancel_reservation(*reservation_id).await?])
        }
        Command::CompleteReservation { reservation_id } => {
            to_rows([engine.complete_reservation(*reservation_id).await?])
        }
        Command::SelectHotels => to_rows(engine.list_hotels_with_assignment_status().await?),
        Command::SelectAvailableRooms => to_rows(engine.list_available_rooms_across_hotels().await?),
        Command::SelectRoomCapacity { hotel_id } => to_rows(engine.list_rooms_for_hotel(*hotel_id).await?),
        Command::SelectReservationRooms { reservation_id } => {
            to_rows(engine.list_rooms_for_reservation(*reservation_id).await?)
        }
        Command::SelectGuestReservations { guest_id } => {
            to_rows(engine.list_reservations_for_guest(*guest_id).await?)
        }
        Command::SelectReservation { id } => to_rows([engine.get_reservation(*id).await?]),
        Command::SelectEventTypes => to_rows(engine.list_event_types()),
    }
}

/// A mutation that lost a lock race applied nothing, so it gets one more try.
async fn execute_with_retry(engine: &Engine, cmd: &Command) -> Result<Vec<JsonValue>, EngineError> {
    match execute(engine, cmd).await {
        Err(e) if cmd.is_mutation() && e.kind() == ErrorKind::Conflict => {
            debug!(command = command_label(cmd), "conflict, retrying once");
            execute(engine, cmd).await
        }
        other => other,
    }
}

/// Parse, execute and record metrics for one request line.
pub async fn handle_line(engine: &Engine, line: &str) -> Response {
    let cmd = match parse_sql(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!("rejected statement: {e}");
            return Response::from_sql_error(&e);
        }
    };
    let label = command_label(&cmd);
    let start = Instant::now();
    let result = execute_with_retry(engine, &cmd).await;
    metrics::histogram!(observability::COMMAND_DURATION_SECONDS, "command" => label)
        .record(start.elapsed().as_secs_f64());
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind().label(),
    };
    metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => status).increment(1);

    match result {
        Ok(rows) => Response::rows(rows),
        Err(e) => {
            debug!(command = label, "command failed: {e}");
            Response::from_engine_error(&e)
        }
    }
}

async fn send(framed: &mut Framed<TcpStream, LinesCodec>, resp: &Response) -> io::Result<()> {
    let json = serde_json::to_string(resp).map_err(io::Error::other)?;
    framed.send(json).await.map_err(|e| match e {
        LinesCodecError::Io(e) => e,
        other => io::Error::other(other),
    })
}

/// Serve one client until it disconnects.
pub async fn process_connection(socket: TcpStream, engine: Arc<Engine>) -> io::Result<()> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    while let Some(line) = framed.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                let resp = Response::error(
                    ErrorKind::Validation,
                    format!("request line exceeds {MAX_LINE_LEN} bytes"),
                    false,
                );
                send(&mut framed, &resp).await?;
                return Ok(());
            }
            Err(LinesCodecError::Io(e)) => return Err(e),
        };
        if line.trim().is_empty() {
            continue;
        }
        let resp = handle_line(&engine, &line).await;
        send(&mut framed, &resp).await?;
    }
    Ok(())
}

/// Accept loop. Connections beyond `max_connections` are refused. When
/// `shutdown` resolves, accepting stops and open connections get up to ten
/// seconds to finish.
pub async fn serve(
    listener: TcpListener,
    engine: Arc<Engine>,
    max_connections: usize,
    shutdown: impl Future<Output = ()>,
) -> io::Result<()> {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (socket, peer) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("connection limit reached, rejecting {peer}");
                        metrics::counter!(observability::CONNECTIONS_REJECTED_TOTAL).increment(1);
                        let refusal = Response::error(ErrorKind::Storage, "too many connections", true);
                        if let Ok(mut line) = serde_json::to_string(&refusal) {
                            line.push('\n');
                            let _ = socket.try_write(line.as_bytes());
                        }
                        drop(socket);
                        continue;
                    }
                };

                info!("connection from {peer}");
                metrics::counter!(observability::CONNECTIONS_TOTAL).increment(1);
                metrics::gauge!(observability::CONNECTIONS_ACTIVE).increment(1.0);
                let engine = engine.clone();

                tokio::spawn(async move {
                    let _permit = permit; // held until connection closes
                    if let Err(e) = process_connection(socket, engine).await {
                        error!("connection error from {peer}: {e}");
                    }
                    metrics::gauge!(observability::CONNECTIONS_ACTIVE).decrement(1.0);
                });
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
        }
    }

    info!("draining connections...");
    let drain_deadline = tokio::time::sleep(DRAIN_TIMEOUT);
    tokio::pin!(drain_deadline);

    loop {
        if semaphore.available_permits() == max_connections {
            info!("all connections drained");
            break;
        }
        tokio::select! {
            _ = &mut drain_deadline => {
                let remaining = max_connections - semaphore.available_permits();
                warn!("drain timeout, {remaining} connections still open");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
    Ok(())
}
