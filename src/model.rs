use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    /// Created, awaiting the owner's decision.
    Waiting,
    Approved,
    Rejected,
    /// Defined for compatibility; no operation currently transitions into it.
    Canceled,
}

/// Listing filter accepted by the booking queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl SearchState {
    /// Exact uppercase match; anything else is an unknown state.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALL" => Some(SearchState::All),
            "CURRENT" => Some(SearchState::Current),
            "PAST" => Some(SearchState::Past),
            "FUTURE" => Some(SearchState::Future),
            "WAITING" => Some(SearchState::Waiting),
            "REJECTED" => Some(SearchState::Rejected),
            _ => None,
        }
    }
}

/// Value snapshot of the booked item, captured when the booking is created.
/// Never a live reference — later item edits don't rewrite booking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
}

/// A request by a user (booker) to use an item for a time interval,
/// subject to owner approval. Bookings are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub item: ItemRef,
    pub booker_id: Ulid,
    pub status: BookingStatus,
}

impl Booking {
    /// `start <= now <= end` — the booking is in progress.
    pub fn is_current(&self, now: Ms) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn is_past(&self, now: Ms) -> bool {
        self.end < now
    }

    pub fn is_future(&self, now: Ms) -> bool {
        self.start > now
    }
}

/// A shareable item as seen by the booking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub description: String,
    /// Gate for new bookings; an unavailable item rejects booking requests.
    pub available: bool,
    /// Set when the item was listed in answer to an item request.
    pub request_id: Option<Ulid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Ulid,
    pub name: String,
}

/// A wish for an item that does not exist yet; other users answer it by
/// listing an item against the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub id: Ulid,
    pub description: String,
    pub requester_id: Ulid,
    pub created: Ms,
}

/// A comment left on an item by a user who has a completed booking of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Ulid,
    pub item_id: Ulid,
    pub author_id: Ulid,
    pub author_name: String,
    pub text: String,
    pub created: Ms,
}
