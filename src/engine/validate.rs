use std::collections::HashSet;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

fn check_len(value: &str, max: usize, what: &'static str) -> Result<(), EngineError> {
    if value.len() > max {
        return Err(EngineError::LimitExceeded(what));
    }
    Ok(())
}

pub(crate) fn validate_hotel_draft(draft: &HotelDraft) -> Result<(), EngineError> {
    if draft.name.trim().is_empty() {
        return Err(EngineError::Validation("hotel name must not be blank".into()));
    }
    check_len(draft.name.trim(), MAX_HOTEL_NAME_LEN, "hotel name too long")?;
    for field in [
        &draft.address,
        &draft.state,
        &draft.zip_code,
        &draft.website,
        &draft.phone,
    ] {
        check_len(field, MAX_FIELD_LEN, "hotel field too long")?;
    }
    Ok(())
}

/// Check every entry and convert to stored rows. Nothing is returned unless
/// every entry is valid, so a bad row can never be partially applied.
pub(crate) fn validate_capacity_entries(
    hotel_id: Ulid,
    entries: &[CapacityEntry],
) -> Result<Vec<RoomTypeCapacity>, EngineError> {
    if entries.is_empty() {
        return Err(EngineError::Validation("at least one room size is required".into()));
    }
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.size) {
            return Err(EngineError::Validation(format!(
                "room size {} listed more than once",
                entry.size
            )));
        }
        if entry.total < 0 || entry.available < 0 || entry.available > entry.total {
            return Err(EngineError::Validation(format!(
                "invalid totals for {} (total {}, available {}): need 0 <= available <= total",
                entry.size, entry.total, entry.available
            )));
        }
        if entry.total > MAX_ROOMS_PER_SIZE {
            return Err(EngineError::LimitExceeded("too many rooms for one size"));
        }
        let total = u32::try_from(entry.total)
            .map_err(|_| EngineError::LimitExceeded("too many rooms for one size"))?;
        let available = u32::try_from(entry.available)
            .map_err(|_| EngineError::LimitExceeded("too many rooms for one size"))?;
        rows.push(RoomTypeCapacity {
            hotel_id,
            size: entry.size,
            total,
            available,
        });
    }
    rows.sort_by_key(|r| r.size);
    Ok(rows)
}

/// A strictly positive count bounded by `max`.
pub(crate) fn validate_count(value: i64, what: &'static str, max: i64) -> Result<u32, EngineError> {
    if value <= 0 {
        return Err(EngineError::Validation(format!(
            "{what} must be greater than zero (got {value})"
        )));
    }
    if value > max {
        return Err(EngineError::LimitExceeded(what));
    }
    u32::try_from(value).map_err(|_| EngineError::LimitExceeded(what))
}

pub(crate) fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<(), EngineError> {
    if start >= end {
        return Err(EngineError::Validation(format!(
            "start date {start} must be before end date {end}"
        )));
    }
    if (end - start).num_days() > MAX_RESERVATION_DAYS {
        return Err(EngineError::LimitExceeded("reservation spans too many days"));
    }
    Ok(())
}

pub(crate) fn check_available(room: &RoomTypeCapacity, quantity: u32) -> Result<(), EngineError> {
    if quantity > room.available {
        return Err(EngineError::InsufficientCapacity {
            hotel_id: room.hotel_id,
            size: room.size,
            requested: quantity,
            available: room.available,
        });
    }
    Ok(())
}

/// A release may never push `available` past `total`.
pub(crate) fn check_release(room: &RoomTypeCapacity, quantity: u32) -> Result<(), EngineError> {
    if quantity > room.in_use() {
        return Err(EngineError::OverRelease {
            hotel_id: room.hotel_id,
            size: room.size,
            quantity,
            available: room.available,
            total: room.total,
        });
    }
    Ok(())
}

/// Rooms held by `Reserved` reservations always count as in use, so a later
/// cancel can give them back without overfilling the row.
pub(crate) fn check_reserved_covered(room: &RoomTypeCapacity, reserved: u32) -> Result<(), EngineError> {
    if room.in_use() < reserved {
        return Err(EngineError::Validation(format!(
            "{reserved} {} rooms are held by reservations; at most {} of {} can be available",
            room.size,
            room.total.saturating_sub(reserved),
            room.total
        )));
    }
    Ok(())
}

pub(crate) fn check_transition(
    reservation: &EventReservation,
    to: ReservationStatus,
) -> Result<(), EngineError> {
    if reservation.status.is_terminal() || to == ReservationStatus::Reserved {
        return Err(EngineError::InvalidTransition {
            id: reservation.id,
            from: reservation.status,
            to,
        });
    }
    Ok(())
}
