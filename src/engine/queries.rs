use ulid::Ulid;

use crate::model::*;

use super::{BookingFilter, Engine, EngineError};

impl Engine {
    /// Fetch one booking; only the booker or the item owner may see it.
    pub async fn get_booking_by_id(
        &self,
        booking_id: Ulid,
        caller_id: Ulid,
    ) -> Result<Booking, EngineError> {
        self.require_user(caller_id)?;
        let booking = self
            .store
            .get(booking_id)
            .await
            .ok_or(EngineError::BookingNotFound(booking_id))?;

        if booking.booker_id != caller_id && booking.item.owner_id != caller_id {
            return Err(EngineError::NotAuthorized { user_id: caller_id });
        }
        Ok(booking)
    }

    /// Bookings made by `user_id`, start-descending, paged.
    pub async fn bookings_for_booker(
        &self,
        state: &str,
        user_id: Ulid,
        from: usize,
        size: usize,
    ) -> Result<Vec<Booking>, EngineError> {
        let (filter, page) = self.listing_params(state, user_id, from, size)?;
        Ok(self.store.page_for_booker(user_id, filter, page).await)
    }

    /// Bookings of items owned by `user_id`, start-descending, paged.
    pub async fn bookings_for_owner(
        &self,
        state: &str,
        user_id: Ulid,
        from: usize,
        size: usize,
    ) -> Result<Vec<Booking>, EngineError> {
        let (filter, page) = self.listing_params(state, user_id, from, size)?;
        Ok(self.store.page_for_owner(user_id, filter, page).await)
    }

    /// Shared listing preamble: user must exist, state must parse, and both
    /// are checked before any pagination math or store access. "Now" is
    /// captured once per query.
    fn listing_params(
        &self,
        state: &str,
        user_id: Ulid,
        from: usize,
        size: usize,
    ) -> Result<(BookingFilter, super::Page), EngineError> {
        self.require_user(user_id)?;
        let state = SearchState::parse(state)
            .ok_or_else(|| EngineError::UnknownState(state.to_string()))?;

        let filter = match state {
            SearchState::All => BookingFilter::All,
            SearchState::Current => BookingFilter::Current(self.now()),
            SearchState::Past => BookingFilter::Past(self.now()),
            SearchState::Future => BookingFilter::Future(self.now()),
            SearchState::Waiting => BookingFilter::Status(BookingStatus::Waiting),
            SearchState::Rejected => BookingFilter::Status(BookingStatus::Rejected),
        };
        Ok((filter, Self::page_of(from, size)))
    }

    /// Most recent finished booking of an item, owner's view. Callers other
    /// than the owner get `None` — the owner predicate is part of the query.
    pub async fn last_booking_for_item(&self, item_id: Ulid, owner_id: Ulid) -> Option<Booking> {
        self.store
            .last_for_item(item_id, owner_id, self.now())
            .await
    }

    /// Upcoming booking of an item (earliest end after now), owner's view.
    pub async fn next_booking_for_item(&self, item_id: Ulid, owner_id: Ulid) -> Option<Booking> {
        self.store
            .next_for_item(item_id, owner_id, self.now())
            .await
    }

    /// Whether `booker_id` has completed a booking of `item_id`. The comment
    /// collaborator uses this as its submission gate.
    pub async fn has_finished_booking(&self, booker_id: Ulid, item_id: Ulid) -> bool {
        self.store
            .finished_booking_exists(booker_id, item_id, self.now())
            .await
    }
}
