use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

/// Page descriptor handed to the store. The engine aligns `offset` to a page
/// boundary before it gets here (`offset = (from / size) * size`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Closed filter set for listing queries. Temporal variants carry the "now"
/// captured once at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingFilter {
    All,
    /// `start <= now <= end`, both ends inclusive.
    Current(Ms),
    /// `end < now`, strict.
    Past(Ms),
    /// `start > now`, strict.
    Future(Ms),
    Status(BookingStatus),
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        match *self {
            BookingFilter::All => true,
            BookingFilter::Current(now) => booking.is_current(now),
            BookingFilter::Past(now) => booking.is_past(now),
            BookingFilter::Future(now) => booking.is_future(now),
            BookingFilter::Status(status) => booking.status == status,
        }
    }
}

/// Failure modes of the atomic status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecideError {
    NotFound,
    AlreadyDecided,
}

/// Persistence for bookings plus the query shapes the engine and the comment
/// collaborator need. Pages are stable and ordered by `start` descending.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking);

    async fn get(&self, id: Ulid) -> Option<Booking>;

    /// Atomic check-and-set of the status. Fails with `AlreadyDecided` when
    /// the booking already holds `target`; the check and the write are one
    /// unit, so two concurrent decisions cannot both succeed.
    async fn decide(&self, id: Ulid, target: BookingStatus) -> Result<Booking, DecideError>;

    /// Bookings made by `booker_id`.
    async fn page_for_booker(
        &self,
        booker_id: Ulid,
        filter: BookingFilter,
        page: Page,
    ) -> Vec<Booking>;

    /// Bookings whose item belongs to `owner_id`.
    async fn page_for_owner(
        &self,
        owner_id: Ulid,
        filter: BookingFilter,
        page: Page,
    ) -> Vec<Booking>;

    /// Most recent booking of the (item, owner) pair ending before `now`.
    async fn last_for_item(&self, item_id: Ulid, owner_id: Ulid, now: Ms) -> Option<Booking>;

    /// Earliest booking of the (item, owner) pair ending after `now`.
    async fn next_for_item(&self, item_id: Ulid, owner_id: Ulid, now: Ms) -> Option<Booking>;

    /// Whether `booker_id` has a booking of `item_id` that already ended.
    /// Gates comment creation.
    async fn finished_booking_exists(&self, booker_id: Ulid, item_id: Ulid, now: Ms) -> bool;
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: DashMap<Ulid, Booking>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter, order by start descending (id breaks ties for determinism),
    /// then cut the requested page.
    fn page<F>(&self, scope: F, filter: BookingFilter, page: Page) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut hits: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| scope(e.value()) && filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        hits.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
        hits.into_iter().skip(page.offset).take(page.limit).collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    async fn get(&self, id: Ulid) -> Option<Booking> {
        self.bookings.get(&id).map(|e| e.value().clone())
    }

    async fn decide(&self, id: Ulid, target: BookingStatus) -> Result<Booking, DecideError> {
        // get_mut holds the shard lock for the whole check-and-set.
        let mut entry = self.bookings.get_mut(&id).ok_or(DecideError::NotFound)?;
        if entry.status == target {
            return Err(DecideError::AlreadyDecided);
        }
        entry.status = target;
        Ok(entry.value().clone())
    }

    async fn page_for_booker(
        &self,
        booker_id: Ulid,
        filter: BookingFilter,
        page: Page,
    ) -> Vec<Booking> {
        self.page(|b| b.booker_id == booker_id, filter, page)
    }

    async fn page_for_owner(
        &self,
        owner_id: Ulid,
        filter: BookingFilter,
        page: Page,
    ) -> Vec<Booking> {
        self.page(|b| b.item.owner_id == owner_id, filter, page)
    }

    async fn last_for_item(&self, item_id: Ulid, owner_id: Ulid, now: Ms) -> Option<Booking> {
        self.bookings
            .iter()
            .filter(|e| {
                e.item.id == item_id && e.item.owner_id == owner_id && e.end < now
            })
            .max_by_key(|e| (e.end, e.id))
            .map(|e| e.value().clone())
    }

    async fn next_for_item(&self, item_id: Ulid, owner_id: Ulid, now: Ms) -> Option<Booking> {
        self.bookings
            .iter()
            .filter(|e| {
                e.item.id == item_id && e.item.owner_id == owner_id && e.end > now
            })
            .min_by_key(|e| (e.end, e.id))
            .map(|e| e.value().clone())
    }

    async fn finished_booking_exists(&self, booker_id: Ulid, item_id: Ulid, now: Ms) -> bool {
        self.bookings
            .iter()
            .any(|e| e.booker_id == booker_id && e.item.id == item_id && e.end < now)
    }
}
