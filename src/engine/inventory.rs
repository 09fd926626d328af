use tracing::{error, info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::validate::*;
use super::{Engine, EngineError};

/// The capacity row for `size`, or NotFound if the hotel never registered it.
pub(super) fn room_row(hs: &HotelState, size: RoomSize) -> Result<&RoomTypeCapacity, EngineError> {
    hs.room(size)
        .ok_or_else(|| EngineError::not_found("room type", format!("{}/{size}", hs.hotel.id)))
}

/// Availability check shared by every debit path. Rejections are counted and logged.
pub(super) fn check_debit(hs: &HotelState, size: RoomSize, quantity: u32) -> Result<(), EngineError> {
    let room = room_row(hs, size)?;
    check_available(room, quantity).inspect_err(|_| {
        metrics::counter!(observability::CAPACITY_REJECTIONS_TOTAL, "size" => size.label())
            .increment(1);
        warn!(
            hotel_id = %hs.hotel.id,
            %size,
            requested = quantity,
            available = room.available,
            "insufficient capacity"
        );
    })
}

/// Release check shared by every credit path. An over-release is an upstream
/// bookkeeping bug and is logged as such.
pub(super) fn check_credit(hs: &HotelState, size: RoomSize, quantity: u32) -> Result<(), EngineError> {
    let room = room_row(hs, size)?;
    check_release(room, quantity).inspect_err(|_| {
        error!(
            hotel_id = %hs.hotel.id,
            %size,
            quantity,
            available = room.available,
            total = room.total,
            "release would exceed total; rejected"
        );
    })
}

impl Engine {
    pub async fn register_hotel(&self, draft: HotelDraft) -> Result<Hotel, EngineError> {
        validate_hotel_draft(&draft)?;

        let _registration = self.registration.lock().await;
        if self.store.hotel_count() >= MAX_HOTELS {
            return Err(EngineError::LimitExceeded("too many hotels"));
        }
        let name = draft.name.trim().to_string();
        if self.store.hotel_id_by_name(&name).is_some() {
            return Err(EngineError::DuplicateHotel(name));
        }

        let hotel = Hotel {
            id: Ulid::new(),
            name,
            address: draft.address,
            state: draft.state,
            zip_code: draft.zip_code,
            website: draft.website,
            phone: draft.phone,
        };
        self.wal_append(&Event::HotelRegistered { hotel: hotel.clone() })
            .await?;
        self.store.insert_hotel(hotel.clone());
        info!(hotel_id = %hotel.id, name = %hotel.name, "hotel registered");
        Ok(hotel)
    }

    /// Upsert every submitted size row as one unit. Sizes not mentioned are
    /// left as they are. Returns all of the hotel's rows afterwards.
    pub async fn set_room_capacity(
        &self,
        hotel_id: Ulid,
        entries: Vec<CapacityEntry>,
    ) -> Result<Vec<RoomTypeCapacity>, EngineError> {
        let rows = validate_capacity_entries(hotel_id, &entries)?;
        let mut guard = self.lock_hotel_write(hotel_id).await?;
        for row in &rows {
            check_reserved_covered(row, guard.reserved_quantity(row.size))?;
        }

        let unchanged = rows.iter().all(|r| guard.rooms.get(&r.size) == Some(r));
        if !unchanged {
            let event = Event::CapacitySet {
                hotel_id,
                rows: rows.clone(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            for row in &rows {
                info!(%hotel_id, size = %row.size, total = row.total, available = row.available, "room capacity set");
            }
        }
        Ok(guard.rooms.values().copied().collect())
    }

    pub async fn reserve_capacity(
        &self,
        hotel_id: Ulid,
        size: RoomSize,
        quantity: i64,
    ) -> Result<RoomTypeCapacity, EngineError> {
        let quantity = validate_count(quantity, "quantity", MAX_RESERVATION_QUANTITY)?;
        let mut guard = self.lock_hotel_write(hotel_id).await?;
        check_debit(&guard, size, quantity)?;

        let event = Event::CapacityReserved {
            hotel_id,
            size,
            quantity,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        let row = *room_row(&guard, size)?;
        info!(%hotel_id, %size, quantity, available = row.available, "capacity reserved");
        Ok(row)
    }

    pub async fn release_capacity(
        &self,
        hotel_id: Ulid,
        size: RoomSize,
        quantity: i64,
    ) -> Result<RoomTypeCapacity, EngineError> {
        let quantity = validate_count(quantity, "quantity", MAX_RESERVATION_QUANTITY)?;
        let mut guard = self.lock_hotel_write(hotel_id).await?;
        check_credit(&guard, size, quantity)?;
        // Rooms backing live reservations come back through cancel, not here.
        let current = *room_row(&guard, size)?;
        let after = RoomTypeCapacity {
            available: current.available + quantity,
            ..current
        };
        check_reserved_covered(&after, guard.reserved_quantity(size))?;

        let event = Event::CapacityReleased {
            hotel_id,
            size,
            quantity,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        let row = *room_row(&guard, size)?;
        info!(%hotel_id, %size, quantity, available = row.available, "capacity released");
        Ok(row)
    }
}
