use ulid::Ulid;

use crate::model::*;

use super::store::DecideError;
use super::{Engine, EngineError};

impl Engine {
    /// Create a booking request. Checks run in a fixed order and the first
    /// failure wins; on success exactly one booking is persisted, WAITING.
    pub async fn add_booking(
        &self,
        start: Ms,
        end: Ms,
        item_id: Ulid,
        booker_id: Ulid,
    ) -> Result<Booking, EngineError> {
        self.require_user(booker_id)?;
        let item = self.require_item(item_id)?;

        if item.owner_id == booker_id {
            // Same answer as a missing item: ownership is not confirmed to
            // the caller.
            return Err(EngineError::ItemNotFound(item_id));
        }
        if !item.available {
            return Err(EngineError::Validation(format!(
                "item {item_id} is not available for booking"
            )));
        }
        if start > end {
            return Err(EngineError::Validation(
                "booking start is after its end".into(),
            ));
        }

        let booking = Booking {
            id: Ulid::new(),
            start,
            end,
            item: ItemRef {
                id: item.id,
                owner_id: item.owner_id,
                name: item.name,
            },
            booker_id,
            status: BookingStatus::Waiting,
        };
        self.store.insert(booking.clone()).await;
        tracing::info!(booking = %booking.id, item = %item_id, booker = %booker_id, "booking created");
        Ok(booking)
    }

    /// Owner's decision on a waiting booking. Repeating a decision that the
    /// booking already holds is an error, not a no-op; deciding the *other*
    /// direction after a terminal status is deliberately still allowed.
    pub async fn approve_booking(
        &self,
        booking_id: Ulid,
        approve: bool,
        caller_id: Ulid,
    ) -> Result<Booking, EngineError> {
        let booking = self
            .store
            .get(booking_id)
            .await
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        if booking.item.owner_id != caller_id {
            return Err(EngineError::NotOwner { user_id: caller_id });
        }

        let target = if approve {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        };

        match self.store.decide(booking_id, target).await {
            Ok(updated) => {
                tracing::info!(booking = %booking_id, status = ?target, "booking decided");
                Ok(updated)
            }
            Err(DecideError::AlreadyDecided) => Err(EngineError::AlreadyDecided(booking_id)),
            Err(DecideError::NotFound) => Err(EngineError::BookingNotFound(booking_id)),
        }
    }
}
