//! Hard bounds on every caller-controlled size. Exceeding one is a
//! validation failure, never a panic or an unbounded allocation.

pub const MAX_HOTELS: usize = 10_000;
pub const MAX_HOTEL_NAME_LEN: usize = 255;
pub const MAX_FIELD_LEN: usize = 512;

/// Upper bound for `total` on a single room-size row.
pub const MAX_ROOMS_PER_SIZE: i64 = 100_000;

pub const MAX_RESERVATION_QUANTITY: i64 = 100_000;
pub const MAX_PEOPLE_COUNT: i64 = 100_000;
pub const MAX_RESERVATION_DAYS: i64 = 366;
pub const MAX_RESERVATIONS_PER_HOTEL: usize = 1_000_000;

/// Longest accepted console request line, in bytes.
pub const MAX_LINE_LEN: usize = 8 * 1024;
