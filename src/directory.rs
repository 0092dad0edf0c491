use dashmap::DashMap;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{ItemRecord, UserRecord};

/// Read-only user lookup consumed by the booking engine.
pub trait UserDirectory: Send + Sync {
    fn get(&self, id: Ulid) -> Option<UserRecord>;

    fn exists(&self, id: Ulid) -> bool {
        self.get(id).is_some()
    }
}

/// Read-only item view consumed by the booking engine and the request
/// display.
pub trait ItemCatalog: Send + Sync {
    fn get(&self, id: Ulid) -> Option<ItemRecord>;

    /// Items listed in answer to `request_id`, stable id order.
    fn answering(&self, request_id: Ulid) -> Vec<ItemRecord>;
}

// ── In-memory implementations ────────────────────────────

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<Ulid, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: String) -> UserRecord {
        let user = UserRecord {
            id: Ulid::new(),
            name,
        };
        self.users.insert(user.id, user.clone());
        user
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get(&self, id: Ulid) -> Option<UserRecord> {
        self.users.get(&id).map(|e| e.value().clone())
    }
}

/// Partial item update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Default)]
pub struct InMemoryItemCatalog {
    items: DashMap<Ulid, ItemRecord>,
}

impl InMemoryItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        owner_id: Ulid,
        name: String,
        description: String,
        available: bool,
        request_id: Option<Ulid>,
    ) -> ItemRecord {
        let item = ItemRecord {
            id: Ulid::new(),
            owner_id,
            name,
            description,
            available,
            request_id,
        };
        self.items.insert(item.id, item.clone());
        item
    }

    /// Merge non-empty patch fields into an existing item. Only the owner may edit.
    pub fn update(
        &self,
        item_id: Ulid,
        caller_id: Ulid,
        patch: ItemPatch,
    ) -> Result<ItemRecord, EngineError> {
        let mut entry = self
            .items
            .get_mut(&item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;
        if entry.owner_id != caller_id {
            return Err(EngineError::NotOwner { user_id: caller_id });
        }
        if let Some(name) = patch.name {
            entry.name = name;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(available) = patch.available {
            entry.available = available;
        }
        Ok(entry.value().clone())
    }

    /// Items of one owner, stable id order, paged by `(offset, limit)`.
    pub fn owned_by(&self, owner_id: Ulid, offset: usize, limit: usize) -> Vec<ItemRecord> {
        let mut items: Vec<ItemRecord> = self
            .items
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

impl ItemCatalog for InMemoryItemCatalog {
    fn get(&self, id: Ulid) -> Option<ItemRecord> {
        self.items.get(&id).map(|e| e.value().clone())
    }

    fn answering(&self, request_id: Ulid) -> Vec<ItemRecord> {
        let mut items: Vec<ItemRecord> = self
            .items
            .iter()
            .filter(|e| e.request_id == Some(request_id))
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        items
    }
}
