use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: console commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "roomledger_commands_total";

/// Histogram: command latency in seconds. Labels: command.
pub const COMMAND_DURATION_SECONDS: &str = "roomledger_command_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active console connections.
pub const CONNECTIONS_ACTIVE: &str = "roomledger_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "roomledger_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "roomledger_connections_rejected_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "roomledger_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "roomledger_wal_flush_batch_size";

/// Counter: lock waits that ran out of budget. Labels: mode (read, write).
pub const LOCK_TIMEOUTS_TOTAL: &str = "roomledger_lock_timeouts_total";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: debits refused for lack of rooms. Labels: size.
pub const CAPACITY_REJECTIONS_TOTAL: &str = "roomledger_capacity_rejections_total";

/// Counter: reservations created.
pub const RESERVATIONS_CREATED_TOTAL: &str = "roomledger_reservations_created_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertHotel(_) => "insert_hotel",
        Command::SetRoomCapacity { .. } => "set_room_capacity",
        Command::InsertReservation(_) => "insert_reservation",
        Command::ReserveCapacity { .. } => "reserve_capacity",
        Command::ReleaseCapacity { .. } => "release_capacity",
        Command::AddExtraRoom { .. } => "add_extra_room",
        Command::CancelReservation { .. } => "cancel_reservation",
        Command::CompleteReservation { .. } => "complete_reservation",
        Command::SelectHotels => "select_hotels",
        Command::SelectAvailableRooms => "select_available_rooms",
        Command::SelectRoomCapacity { .. } => "select_room_capacity",
        Command::SelectReservationRooms { .. } => "select_reservation_rooms",
        Command::SelectGuestReservations { .. } => "select_guest_reservations",
        Command::SelectReservation { .. } => "select_reservation",
        Command::SelectEventTypes => "select_event_types",
    }
}
