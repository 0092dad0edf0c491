use std::sync::Arc;

use dashmap::DashMap;
use ulid::Ulid;

use crate::clock::Clock;
use crate::directory::UserDirectory;
use crate::engine::EngineError;
use crate::model::*;

/// Item-request collaborator: a user describes an item they wish existed, and
/// other users answer by listing an item against the request.
pub struct RequestService {
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    requests: DashMap<Ulid, ItemRequest>,
}

impl RequestService {
    pub fn new(users: Arc<dyn UserDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            clock,
            requests: DashMap::new(),
        }
    }

    pub fn add_request(
        &self,
        description: String,
        requester_id: Ulid,
    ) -> Result<ItemRequest, EngineError> {
        if !self.users.exists(requester_id) {
            return Err(EngineError::UserNotFound(requester_id));
        }
        let request = ItemRequest {
            id: Ulid::new(),
            description,
            requester_id,
            created: self.clock.now_ms(),
        };
        self.requests.insert(request.id, request.clone());
        tracing::info!(request = %request.id, requester = %requester_id, "item request created");
        Ok(request)
    }

    /// The caller's own requests, newest first.
    pub fn requests_for_user(&self, user_id: Ulid) -> Result<Vec<ItemRequest>, EngineError> {
        if !self.users.exists(user_id) {
            return Err(EngineError::UserNotFound(user_id));
        }
        Ok(self.collect(|r| r.requester_id == user_id, 0, usize::MAX))
    }

    /// Requests from everyone but the caller, newest first, paged with the
    /// same page-collapse rule as the booking listings.
    pub fn requests_from_others(
        &self,
        user_id: Ulid,
        from: usize,
        size: usize,
    ) -> Result<Vec<ItemRequest>, EngineError> {
        if !self.users.exists(user_id) {
            return Err(EngineError::UserNotFound(user_id));
        }
        let offset = (from / size) * size;
        Ok(self.collect(|r| r.requester_id != user_id, offset, size))
    }

    pub fn request_by_id(
        &self,
        request_id: Ulid,
        caller_id: Ulid,
    ) -> Result<ItemRequest, EngineError> {
        if !self.users.exists(caller_id) {
            return Err(EngineError::UserNotFound(caller_id));
        }
        self.requests
            .get(&request_id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::RequestNotFound(request_id))
    }

    fn collect<F>(&self, scope: F, offset: usize, limit: usize) -> Vec<ItemRequest>
    where
        F: Fn(&ItemRequest) -> bool,
    {
        let mut hits: Vec<ItemRequest> = self
            .requests
            .iter()
            .filter(|e| scope(e.value()))
            .map(|e| e.value().clone())
            .collect();
        hits.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        hits.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::directory::InMemoryUserDirectory;

    const NOW: Ms = 1_700_000_000_000;

    fn service() -> (RequestService, Arc<InMemoryUserDirectory>, Arc<ManualClock>) {
        let users = Arc::new(InMemoryUserDirectory::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let service = RequestService::new(users.clone(), clock.clone());
        (service, users, clock)
    }

    #[test]
    fn add_request_stamps_creation_time() {
        let (service, users, _) = service();
        let requester = users.register("ada".into()).id;

        let request = service.add_request("a 3m ladder".into(), requester).unwrap();
        assert_eq!(request.requester_id, requester);
        assert_eq!(request.created, NOW);
        assert_eq!(service.requests_for_user(requester).unwrap(), vec![request]);
    }

    #[test]
    fn unknown_users_are_rejected_everywhere() {
        let (service, users, _) = service();
        let ghost = Ulid::new();

        let result = service.add_request("anything".into(), ghost);
        assert_eq!(result, Err(EngineError::UserNotFound(ghost)));
        assert_eq!(
            service.requests_for_user(ghost),
            Err(EngineError::UserNotFound(ghost))
        );
        assert_eq!(
            service.requests_from_others(ghost, 0, 10),
            Err(EngineError::UserNotFound(ghost))
        );

        let user = users.register("ada".into()).id;
        assert_eq!(
            service.request_by_id(Ulid::new(), ghost),
            Err(EngineError::UserNotFound(ghost))
        );
        let missing = Ulid::new();
        assert_eq!(
            service.request_by_id(missing, user),
            Err(EngineError::RequestNotFound(missing))
        );
    }

    #[test]
    fn own_and_other_views_are_disjoint_and_newest_first() {
        let (service, users, clock) = service();
        let ada = users.register("ada".into()).id;
        let bob = users.register("bob".into()).id;

        let first = service.add_request("ladder".into(), ada).unwrap();
        clock.advance(1_000);
        let second = service.add_request("drill".into(), ada).unwrap();
        clock.advance(1_000);
        let bobs = service.add_request("saw".into(), bob).unwrap();

        let own = service.requests_for_user(ada).unwrap();
        assert_eq!(
            own.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let others = service.requests_from_others(ada, 0, 10).unwrap();
        assert_eq!(others.iter().map(|r| r.id).collect::<Vec<_>>(), vec![bobs.id]);
        let others = service.requests_from_others(bob, 0, 10).unwrap();
        assert_eq!(
            others.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[test]
    fn others_listing_collapses_from_to_its_page() {
        let (service, users, clock) = service();
        let requester = users.register("ada".into()).id;
        let reader = users.register("bob".into()).id;

        let mut ids = Vec::new();
        for i in 0..5 {
            let r = service.add_request(format!("wish-{i}"), requester).unwrap();
            clock.advance(1_000);
            ids.push(r.id);
        }
        ids.reverse(); // newest first

        let page1a = service.requests_from_others(reader, 2, 2).unwrap();
        let page1b = service.requests_from_others(reader, 3, 2).unwrap();
        assert_eq!(page1a, page1b);
        assert_eq!(
            page1a.iter().map(|r| r.id).collect::<Vec<_>>(),
            &ids[2..4]
        );
        assert!(service.requests_from_others(reader, 6, 2).unwrap().is_empty());
    }
}
