use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

pub type SharedHotelState = Arc<RwLock<HotelState>>;

/// Hotel names are unique after trimming, case-insensitively.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The live tables. Per-hotel state is behind its own lock; the maps here are
/// indexes that are only touched while the owning hotel's write lock is held
/// (or during single-threaded replay).
pub struct InventoryStore {
    hotels: DashMap<Ulid, SharedHotelState>,
    names: DashMap<String, Ulid>,
    reservation_to_hotel: DashMap<Ulid, Ulid>,
    /// Guest → reservation ids in creation order.
    guest_reservations: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    pub fn new() -> Self {
        Self {
            hotels: DashMap::new(),
            names: DashMap::new(),
            reservation_to_hotel: DashMap::new(),
            guest_reservations: DashMap::new(),
        }
    }

    // ── Hotels ───────────────────────────────────────────────

    pub fn hotel_count(&self) -> usize {
        self.hotels.len()
    }

    pub fn get_hotel(&self, id: &Ulid) -> Option<SharedHotelState> {
        self.hotels.get(id).map(|e| e.value().clone())
    }

    pub fn hotel_id_by_name(&self, name: &str) -> Option<Ulid> {
        self.names.get(&normalize_name(name)).map(|e| *e.value())
    }

    /// Insert a hotel and its name index entry. Returns `None` if the name is taken.
    pub fn insert_hotel(&self, hotel: Hotel) -> Option<SharedHotelState> {
        match self.names.entry(normalize_name(&hotel.name)) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(hotel.id);
                let id = hotel.id;
                let state = Arc::new(RwLock::new(HotelState::new(hotel)));
                self.hotels.insert(id, state.clone());
                Some(state)
            }
        }
    }

    /// Handles for every hotel, sorted by id so multi-lock callers share one order.
    pub fn hotel_handles(&self) -> Vec<(Ulid, SharedHotelState)> {
        let mut handles: Vec<_> = self
            .hotels
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        handles.sort_by_key(|(id, _)| *id);
        handles
    }

    // ── Reservation indexes ──────────────────────────────────

    pub fn hotel_for_reservation(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.reservation_to_hotel.get(reservation_id).map(|e| *e.value())
    }

    pub fn guest_reservation_ids(&self, guest_id: &Ulid) -> Vec<Ulid> {
        self.guest_reservations
            .get(guest_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    fn index_reservation(&self, reservation: &EventReservation) {
        self.reservation_to_hotel
            .insert(reservation.id, reservation.hotel_id);
        self.guest_reservations
            .entry(reservation.guest_id)
            .or_default()
            .push(reservation.id);
    }

    // ── Event application ────────────────────────────────────

    /// Apply a validated event to a hotel (caller holds its write lock).
    /// Arithmetic saturates so replay can never break `available <= total`.
    pub fn apply_event(&self, hs: &mut HotelState, event: &Event) {
        match event {
            Event::CapacitySet { rows, .. } => {
                for row in rows {
                    hs.rooms.insert(row.size, *row);
                }
            }
            Event::CapacityReserved { size, quantity, .. } => debit(hs, *size, *quantity),
            Event::CapacityReleased { size, quantity, .. } => credit(hs, *size, *quantity),
            Event::ReservationCreated { reservation } => {
                debit(hs, reservation.room_size, reservation.quantity);
                hs.reservations.insert(reservation.id, reservation.clone());
                self.index_reservation(reservation);
            }
            Event::ExtraRoomAdded {
                reservation_id,
                quantity,
                ..
            } => {
                if let Some(size) = hs.reservations.get(reservation_id).map(|r| r.room_size) {
                    debit(hs, size, *quantity);
                }
                if let Some(r) = hs.reservations.get_mut(reservation_id) {
                    r.quantity = r.quantity.saturating_add(*quantity);
                }
            }
            Event::ReservationCancelled { reservation_id, .. } => {
                let released = match hs.reservations.get_mut(reservation_id) {
                    Some(r) if r.status == ReservationStatus::Reserved => {
                        r.status = ReservationStatus::Cancelled;
                        Some((r.room_size, r.quantity))
                    }
                    _ => None,
                };
                if let Some((size, quantity)) = released {
                    credit(hs, size, quantity);
                }
            }
            Event::ReservationCompleted { reservation_id, .. } => {
                if let Some(r) = hs.reservations.get_mut(reservation_id)
                    && r.status == ReservationStatus::Reserved
                {
                    r.status = ReservationStatus::Completed;
                }
            }
            Event::ReservationRestored { reservation } => {
                hs.reservations.insert(reservation.id, reservation.clone());
                self.index_reservation(reservation);
            }
            // Registration is handled at the map level, not here.
            Event::HotelRegistered { .. } => {}
        }
    }
}

fn debit(hs: &mut HotelState, size: RoomSize, quantity: u32) {
    if let Some(room) = hs.rooms.get_mut(&size) {
        room.available = room.available.saturating_sub(quantity);
    }
}

fn credit(hs: &mut HotelState, size: RoomSize, quantity: u32) {
    if let Some(room) = hs.rooms.get_mut(&size) {
        room.available = room.available.saturating_add(quantity).min(room.total);
    }
}
