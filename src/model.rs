use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. Used for creation timestamps only; event dates are calendar days.
pub type Ms = i64;

/// Room-size category. The set is closed: capacity rows are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomSize {
    Small,
    Medium,
    Large,
}

impl RoomSize {
    pub const ALL: [RoomSize; 3] = [RoomSize::Small, RoomSize::Medium, RoomSize::Large];

    /// Stable numeric id (the room-type reference used by reservations).
    pub fn id(self) -> u8 {
        match self {
            RoomSize::Small => 1,
            RoomSize::Medium => 2,
            RoomSize::Large => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(RoomSize::Small),
            2 => Some(RoomSize::Medium),
            3 => Some(RoomSize::Large),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoomSize::Small => "small",
            RoomSize::Medium => "medium",
            RoomSize::Large => "large",
        }
    }
}

impl fmt::Display for RoomSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown room size: {0}")]
pub struct UnknownRoomSize(pub String);

impl FromStr for RoomSize {
    type Err = UnknownRoomSize;

    /// Accepts the canonical labels plus the legacy `s`/`m`/`l` and `*_hall` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        let base = norm.strip_suffix("_hall").unwrap_or(&norm);
        match base {
            "small" | "s" => Ok(RoomSize::Small),
            "medium" | "m" => Ok(RoomSize::Medium),
            "large" | "l" => Ok(RoomSize::Large),
            _ => Err(UnknownRoomSize(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Ulid,
    pub name: String,
    pub address: String,
    pub state: String,
    pub zip_code: String,
    pub website: String,
    pub phone: String,
}

/// Input for `register_hotel`. The id is assigned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotelDraft {
    pub name: String,
    pub address: String,
    pub state: String,
    pub zip_code: String,
    pub website: String,
    pub phone: String,
}

impl HotelDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One (hotel, size) inventory row. Invariant: `available <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTypeCapacity {
    pub hotel_id: Ulid,
    pub size: RoomSize,
    pub total: u32,
    pub available: u32,
}

impl RoomTypeCapacity {
    pub fn in_use(&self) -> u32 {
        self.total - self.available
    }
}

/// Requested row for `set_room_capacity`. Signed so that negative input can be
/// represented and rejected instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityEntry {
    pub size: RoomSize,
    pub total: i64,
    pub available: i64,
}

impl CapacityEntry {
    pub fn new(size: RoomSize, total: i64, available: i64) -> Self {
        Self { size, total, available }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReservationStatus::Reserved)
    }

    pub fn label(self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReservation {
    pub id: Ulid,
    pub guest_id: Ulid,
    pub hotel_id: Ulid,
    pub event_type_id: u32,
    pub room_size: RoomSize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: u32,
    pub people_count: u32,
    /// Minor currency units, caller supplied.
    pub invoice: i64,
    pub created_at: Ms,
    pub status: ReservationStatus,
}

/// Input for `create_reservation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub guest_id: Ulid,
    pub hotel_id: Ulid,
    pub event_type_id: u32,
    pub room_size: RoomSize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i64,
    pub people_count: i64,
    pub invoice: i64,
}

/// Per-hotel state. Capacity rows and the hotel's reservations sit behind the
/// same lock so a composite change is applied in one critical section.
#[derive(Debug, Clone)]
pub struct HotelState {
    pub hotel: Hotel,
    pub rooms: BTreeMap<RoomSize, RoomTypeCapacity>,
    pub reservations: HashMap<Ulid, EventReservation>,
}

impl HotelState {
    pub fn new(hotel: Hotel) -> Self {
        Self {
            hotel,
            rooms: BTreeMap::new(),
            reservations: HashMap::new(),
        }
    }

    pub fn room(&self, size: RoomSize) -> Option<&RoomTypeCapacity> {
        self.rooms.get(&size)
    }

    pub fn has_rooms_assigned(&self) -> bool {
        !self.rooms.is_empty()
    }

    /// Sum of quantities held by reservations still in `Reserved`.
    pub fn reserved_quantity(&self, size: RoomSize) -> u32 {
        self.reservations
            .values()
            .filter(|r| r.room_size == size && r.status == ReservationStatus::Reserved)
            .map(|r| r.quantity)
            .sum()
    }
}

/// WAL record format. One record is one atomic unit of work: composite
/// operations are a single variant whose application performs every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    HotelRegistered {
        hotel: Hotel,
    },
    CapacitySet {
        hotel_id: Ulid,
        rows: Vec<RoomTypeCapacity>,
    },
    CapacityReserved {
        hotel_id: Ulid,
        size: RoomSize,
        quantity: u32,
    },
    CapacityReleased {
        hotel_id: Ulid,
        size: RoomSize,
        quantity: u32,
    },
    /// Debits `quantity` from the room row and inserts the reservation.
    ReservationCreated {
        reservation: EventReservation,
    },
    /// Debits `quantity` from the room row and adds it to the reservation.
    ExtraRoomAdded {
        hotel_id: Ulid,
        reservation_id: Ulid,
        quantity: u32,
    },
    /// Credits the reservation's quantity back and marks it cancelled.
    ReservationCancelled {
        hotel_id: Ulid,
        reservation_id: Ulid,
    },
    ReservationCompleted {
        hotel_id: Ulid,
        reservation_id: Ulid,
    },
    /// Snapshot form written by compaction. Inserts without touching capacity.
    ReservationRestored {
        reservation: EventReservation,
    },
}

impl Event {
    pub fn hotel_id(&self) -> Ulid {
        match self {
            Event::HotelRegistered { hotel } => hotel.id,
            Event::ReservationCreated { reservation } | Event::ReservationRestored { reservation } => {
                reservation.hotel_id
            }
            Event::CapacitySet { hotel_id, .. }
            | Event::CapacityReserved { hotel_id, .. }
            | Event::CapacityReleased { hotel_id, .. }
            | Event::ExtraRoomAdded { hotel_id, .. }
            | Event::ReservationCancelled { hotel_id, .. }
            | Event::ReservationCompleted { hotel_id, .. } => *hotel_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotelListing {
    #[serde(flatten)]
    pub hotel: Hotel,
    pub has_rooms_assigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomAvailability {
    pub hotel_id: Ulid,
    pub hotel_name: String,
    pub size: RoomSize,
    pub room_type_id: u8,
    pub total: u32,
    pub available: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRoom {
    pub reservation_id: Ulid,
    pub hotel_id: Ulid,
    pub size: RoomSize,
    pub quantity: u32,
    pub status: ReservationStatus,
    pub total: u32,
    pub available: u32,
}
