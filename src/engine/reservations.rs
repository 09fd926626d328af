use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::inventory::{check_credit, check_debit};
use super::validate::*;
use super::{Engine, EngineError};

impl Engine {
    /// Debit capacity and insert the reservation as one WAL record.
    pub async fn create_reservation(
        &self,
        req: NewReservation,
    ) -> Result<EventReservation, EngineError> {
        validate_dates(req.start_date, req.end_date)?;
        let quantity = validate_count(req.quantity, "quantity", MAX_RESERVATION_QUANTITY)?;
        let people_count = validate_count(req.people_count, "people_count", MAX_PEOPLE_COUNT)?;
        if req.invoice < 0 {
            return Err(EngineError::Validation("invoice must not be negative".into()));
        }
        if !self.has_event_type(req.event_type_id) {
            return Err(EngineError::not_found("event type", req.event_type_id));
        }

        let mut guard = self.lock_hotel_write(req.hotel_id).await?;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_HOTEL {
            return Err(EngineError::LimitExceeded("too many reservations for hotel"));
        }
        check_debit(&guard, req.room_size, quantity)?;

        let reservation = EventReservation {
            id: Ulid::new(),
            guest_id: req.guest_id,
            hotel_id: req.hotel_id,
            event_type_id: req.event_type_id,
            room_size: req.room_size,
            start_date: req.start_date,
            end_date: req.end_date,
            quantity,
            people_count,
            invoice: req.invoice,
            created_at: now_ms(),
            status: ReservationStatus::Reserved,
        };
        let event = Event::ReservationCreated {
            reservation: reservation.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;

        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            reservation_id = %reservation.id,
            hotel_id = %reservation.hotel_id,
            guest_id = %reservation.guest_id,
            size = %reservation.room_size,
            quantity,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Debit `extra` more rooms of the reservation's size and grow its quantity.
    pub async fn add_extra_room(
        &self,
        reservation_id: Ulid,
        extra: i64,
    ) -> Result<EventReservation, EngineError> {
        let extra = validate_count(extra, "extra rooms", MAX_RESERVATION_QUANTITY)?;
        let mut guard = self.resolve_reservation_write(reservation_id).await?;
        let (size, quantity, status) = current(&guard, reservation_id)?;
        if status != ReservationStatus::Reserved {
            return Err(EngineError::Validation(format!(
                "extra rooms can only be added to a reserved reservation; {reservation_id} is {status}"
            )));
        }
        if i64::from(quantity) + i64::from(extra) > MAX_RESERVATION_QUANTITY {
            return Err(EngineError::LimitExceeded("quantity"));
        }
        check_debit(&guard, size, extra)?;

        let event = Event::ExtraRoomAdded {
            hotel_id: guard.hotel.id,
            reservation_id,
            quantity: extra,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        let updated = reservation_in(&guard, reservation_id)?;
        info!(
            %reservation_id,
            hotel_id = %updated.hotel_id,
            extra,
            quantity = updated.quantity,
            "extra rooms added"
        );
        Ok(updated)
    }

    /// Reserved → Cancelled. Gives the reservation's rooms back in the same record.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Ulid,
    ) -> Result<EventReservation, EngineError> {
        let mut guard = self.resolve_reservation_write(reservation_id).await?;
        check_transition(
            &reservation_in(&guard, reservation_id)?,
            ReservationStatus::Cancelled,
        )?;
        let (size, quantity, _) = current(&guard, reservation_id)?;
        check_credit(&guard, size, quantity)?;

        let event = Event::ReservationCancelled {
            hotel_id: guard.hotel.id,
            reservation_id,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!(%reservation_id, hotel_id = %guard.hotel.id, %size, released = quantity, "reservation cancelled");
        reservation_in(&guard, reservation_id)
    }

    /// Reserved → Completed. Capacity is untouched.
    pub async fn complete_reservation(
        &self,
        reservation_id: Ulid,
    ) -> Result<EventReservation, EngineError> {
        let mut guard = self.resolve_reservation_write(reservation_id).await?;
        check_transition(
            &reservation_in(&guard, reservation_id)?,
            ReservationStatus::Completed,
        )?;

        let event = Event::ReservationCompleted {
            hotel_id: guard.hotel.id,
            reservation_id,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!(%reservation_id, hotel_id = %guard.hotel.id, "reservation completed");
        reservation_in(&guard, reservation_id)
    }

    pub(super) fn has_event_type(&self, id: u32) -> bool {
        self.settings
            .event_types
            .binary_search_by_key(&id, |t| t.id)
            .is_ok()
    }
}

fn reservation_in(hs: &HotelState, id: Ulid) -> Result<EventReservation, EngineError> {
    hs.reservations
        .get(&id)
        .cloned()
        .ok_or_else(|| EngineError::not_found("reservation", id))
}

fn current(hs: &HotelState, id: Ulid) -> Result<(RoomSize, u32, ReservationStatus), EngineError> {
    hs.reservations
        .get(&id)
        .map(|r| (r.room_size, r.quantity, r.status))
        .ok_or_else(|| EngineError::not_found("reservation", id))
}
