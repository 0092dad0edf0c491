mod error;
mod mutations;
mod queries;
pub mod store;

pub use error::EngineError;
pub use store::{BookingFilter, BookingStore, InMemoryBookingStore, Page};

use std::sync::Arc;

use ulid::Ulid;

use crate::clock::Clock;
use crate::directory::{ItemCatalog, UserDirectory};
use crate::model::*;

/// The booking core: every business rule touching a booking's existence or
/// status lives here, independent of transport. Collaborators are injected;
/// the engine holds no process-wide mutable state of its own.
pub struct Engine {
    store: Arc<dyn BookingStore>,
    users: Arc<dyn UserDirectory>,
    items: Arc<dyn ItemCatalog>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        users: Arc<dyn UserDirectory>,
        items: Arc<dyn ItemCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            users,
            items,
            clock,
        }
    }

    pub(super) fn now(&self) -> Ms {
        self.clock.now_ms()
    }

    pub(super) fn require_user(&self, user_id: Ulid) -> Result<UserRecord, EngineError> {
        self.users
            .get(user_id)
            .ok_or(EngineError::UserNotFound(user_id))
    }

    pub(super) fn require_item(&self, item_id: Ulid) -> Result<ItemRecord, EngineError> {
        self.items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))
    }

    /// Page-aligned offset: `from` collapses to the page containing it, so
    /// every `from` in `[k*size, (k+1)*size)` yields page `k`.
    pub(super) fn page_of(from: usize, size: usize) -> Page {
        debug_assert!(size > 0, "page size must be positive");
        Page {
            offset: (from / size) * size,
            limit: size,
        }
    }
}
