use std::cmp::Reverse;

use ulid::Ulid;

use crate::model::*;

use super::retry::retry_read;
use super::{Engine, EngineError};

impl Engine {
    // ── Reservations ─────────────────────────────────────────

    /// Newest event first; ties broken by most recently created. Unknown guests get `[]`.
    pub async fn list_reservations_for_guest(
        &self,
        guest_id: Ulid,
    ) -> Result<Vec<EventReservation>, EngineError> {
        retry_read(&self.settings.read_retry, "list_reservations_for_guest", || {
            self.read_guest_reservations(guest_id)
        })
        .await
    }

    async fn read_guest_reservations(
        &self,
        guest_id: Ulid,
    ) -> Result<Vec<EventReservation>, EngineError> {
        let mut out = Vec::new();
        for reservation_id in self.store.guest_reservation_ids(&guest_id) {
            let Some(hotel_id) = self.store.hotel_for_reservation(&reservation_id) else {
                continue;
            };
            let Some(hs) = self.store.get_hotel(&hotel_id) else {
                continue;
            };
            let guard = self.lock_hotel_read(hs).await?;
            if let Some(r) = guard.reservations.get(&reservation_id) {
                out.push(r.clone());
            }
        }
        out.sort_by_key(|r| (Reverse(r.start_date), Reverse(r.created_at), Reverse(r.id)));
        Ok(out)
    }

    pub async fn get_reservation(&self, reservation_id: Ulid) -> Result<EventReservation, EngineError> {
        retry_read(&self.settings.read_retry, "get_reservation", || {
            self.read_reservation(reservation_id)
        })
        .await
    }

    async fn read_reservation(&self, reservation_id: Ulid) -> Result<EventReservation, EngineError> {
        let not_found = || EngineError::not_found("reservation", reservation_id);
        let hotel_id = self
            .store
            .hotel_for_reservation(&reservation_id)
            .ok_or_else(not_found)?;
        let hs = self.store.get_hotel(&hotel_id).ok_or_else(not_found)?;
        let guard = self.lock_hotel_read(hs).await?;
        guard.reservations.get(&reservation_id).cloned().ok_or_else(not_found)
    }

    // ── Hotels & rooms ───────────────────────────────────────

    /// Every hotel, ordered by name.
    pub async fn list_hotels_with_assignment_status(&self) -> Result<Vec<HotelListing>, EngineError> {
        retry_read(&self.settings.read_retry, "list_hotels_with_assignment_status", || {
            self.read_hotel_listings()
        })
        .await
    }

    async fn read_hotel_listings(&self) -> Result<Vec<HotelListing>, EngineError> {
        let mut out = Vec::new();
        for (_, hs) in self.store.hotel_handles() {
            let guard = self.lock_hotel_read(hs).await?;
            out.push(HotelListing {
                hotel: guard.hotel.clone(),
                has_rooms_assigned: guard.has_rooms_assigned(),
            });
        }
        out.sort_by(|a, b| {
            a.hotel
                .name
                .to_lowercase()
                .cmp(&b.hotel.name.to_lowercase())
                .then(a.hotel.id.cmp(&b.hotel.id))
        });
        Ok(out)
    }

    /// Live (hotel, size) availability, ordered by hotel name then size.
    pub async fn list_available_rooms_across_hotels(&self) -> Result<Vec<RoomAvailability>, EngineError> {
        retry_read(&self.settings.read_retry, "list_available_rooms_across_hotels", || {
            self.read_available_rooms()
        })
        .await
    }

    async fn read_available_rooms(&self) -> Result<Vec<RoomAvailability>, EngineError> {
        let mut out = Vec::new();
        for (_, hs) in self.store.hotel_handles() {
            let guard = self.lock_hotel_read(hs).await?;
            out.extend(guard.rooms.values().map(|room| RoomAvailability {
                hotel_id: guard.hotel.id,
                hotel_name: guard.hotel.name.clone(),
                size: room.size,
                room_type_id: room.size.id(),
                total: room.total,
                available: room.available,
            }));
        }
        out.sort_by(|a, b| {
            a.hotel_name
                .to_lowercase()
                .cmp(&b.hotel_name.to_lowercase())
                .then(a.hotel_id.cmp(&b.hotel_id))
                .then(a.size.cmp(&b.size))
        });
        Ok(out)
    }

    /// The hotel's capacity rows ordered by size. Empty if none are assigned yet.
    pub async fn list_rooms_for_hotel(&self, hotel_id: Ulid) -> Result<Vec<RoomTypeCapacity>, EngineError> {
        retry_read(&self.settings.read_retry, "list_rooms_for_hotel", || {
            self.read_hotel_rooms(hotel_id)
        })
        .await
    }

    async fn read_hotel_rooms(&self, hotel_id: Ulid) -> Result<Vec<RoomTypeCapacity>, EngineError> {
        let hs = self
            .store
            .get_hotel(&hotel_id)
            .ok_or_else(|| EngineError::not_found("hotel", hotel_id))?;
        let guard = self.lock_hotel_read(hs).await?;
        Ok(guard.rooms.values().copied().collect())
    }

    /// The room type a reservation holds, with the row's live counts.
    pub async fn list_rooms_for_reservation(
        &self,
        reservation_id: Ulid,
    ) -> Result<Vec<ReservationRoom>, EngineError> {
        retry_read(&self.settings.read_retry, "list_rooms_for_reservation", || {
            self.read_reservation_rooms(reservation_id)
        })
        .await
    }

    async fn read_reservation_rooms(
        &self,
        reservation_id: Ulid,
    ) -> Result<Vec<ReservationRoom>, EngineError> {
        let not_found = || EngineError::not_found("reservation", reservation_id);
        let hotel_id = self
            .store
            .hotel_for_reservation(&reservation_id)
            .ok_or_else(not_found)?;
        let hs = self.store.get_hotel(&hotel_id).ok_or_else(not_found)?;
        let guard = self.lock_hotel_read(hs).await?;
        let r = guard.reservations.get(&reservation_id).ok_or_else(not_found)?;
        Ok(guard
            .room(r.room_size)
            .map(|room| ReservationRoom {
                reservation_id,
                hotel_id,
                size: r.room_size,
                quantity: r.quantity,
                status: r.status,
                total: room.total,
                available: room.available,
            })
            .into_iter()
            .collect())
    }

    // ── Reference data ───────────────────────────────────────

    pub fn list_event_types(&self) -> Vec<EventType> {
        self.settings.event_types.clone()
    }
}
