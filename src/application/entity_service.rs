//! CachedEntityService - read-through access to the REST collaborator.
//!
//! Reads hit the [`EntityCache`] first and fall back to the
//! [`EntityFetcher`]; writes go to the backend and then apply the same
//! invalidation rules realtime events do, so local callers see their own
//! writes before the server echo arrives.

use std::sync::Arc;

use crate::application::EntityCache;
use crate::domain::entity::{EntityRecord, QueryFilters, StatsSnapshot};
use crate::domain::foundation::{DomainError, EntityId, OwnerScope};
use crate::ports::EntityFetcher;

pub struct CachedEntityService<T: EntityRecord> {
    cache: EntityCache<T>,
    fetcher: Arc<dyn EntityFetcher<T>>,
}

impl<T: EntityRecord> Clone for CachedEntityService<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<T: EntityRecord> CachedEntityService<T> {
    pub fn new(cache: EntityCache<T>, fetcher: Arc<dyn EntityFetcher<T>>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &EntityCache<T> {
        &self.cache
    }

    pub async fn get(&self, id: &EntityId) -> Result<Option<T>, DomainError> {
        if let Some(hit) = self.cache.get(id).await {
            tracing::trace!(kind = %T::KIND, id = %id, "Entity cache hit");
            return Ok(Some(hit));
        }
        let fetched = self.fetcher.fetch_one(id).await?;
        if let Some(entity) = &fetched {
            self.cache.put(entity).await;
        }
        Ok(fetched)
    }

    pub async fn list(&self, owner: &OwnerScope, filters: &QueryFilters) -> Result<Vec<T>, DomainError> {
        if let Some(hit) = self.cache.get_list(owner, filters).await {
            tracing::trace!(kind = %T::KIND, owner = %owner, "List cache hit");
            return Ok(hit);
        }
        let fetched = self.fetcher.fetch_list(owner, filters).await?;
        self.cache.put_list(owner, filters, &fetched).await;
        Ok(fetched)
    }

    pub async fn stats(&self, owner: &OwnerScope) -> Result<StatsSnapshot, DomainError> {
        if let Some(hit) = self.cache.get_stats(owner).await {
            return Ok(hit);
        }
        let fetched = self.fetcher.fetch_stats(owner).await?;
        self.cache.put_stats(owner, &fetched).await;
        Ok(fetched)
    }

    pub async fn create(&self, entity: &T) -> Result<T, DomainError> {
        let created = self.fetcher.create(entity).await?;
        self.cache.apply_create(&created).await;
        Ok(created)
    }

    pub async fn update(&self, entity: &T) -> Result<T, DomainError> {
        let updated = self.fetcher.update(entity).await?;
        self.cache.apply_update(&updated).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &EntityId, owner: &OwnerScope) -> Result<(), DomainError> {
        self.fetcher.delete(id).await?;
        self.cache.invalidate_on_delete(id, Some(owner)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::InMemoryCacheStorage;
    use crate::adapters::clock::ManualClock;
    use crate::application::CacheStore;
    use crate::domain::entity::{Notification, NotificationStatus};
    use crate::domain::foundation::ErrorCode;
    use crate::ports::FetchError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn notification(id: i64, agency: &str) -> Notification {
        serde_json::from_value(json!({
            "id": id,
            "agencyId": agency,
            "title": "Document uploaded",
            "message": "Passport scan received",
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[derive(Default)]
    struct CountingFetcher {
        records: Mutex<Vec<Notification>>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EntityFetcher<Notification> for CountingFetcher {
        async fn fetch_one(&self, id: &EntityId) -> Result<Option<Notification>, FetchError> {
            self.hit();
            Ok(self.records.lock().unwrap().iter().find(|n| &n.id == id).cloned())
        }

        async fn fetch_list(
            &self,
            owner: &OwnerScope,
            _filters: &QueryFilters,
        ) -> Result<Vec<Notification>, FetchError> {
            self.hit();
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|n| &n.agency_id == owner)
                .cloned()
                .collect())
        }

        async fn fetch_stats(&self, _owner: &OwnerScope) -> Result<StatsSnapshot, FetchError> {
            self.hit();
            Err(FetchError::Unauthorized)
        }

        async fn create(&self, entity: &Notification) -> Result<Notification, FetchError> {
            self.hit();
            self.records.lock().unwrap().push(entity.clone());
            Ok(entity.clone())
        }

        async fn update(&self, entity: &Notification) -> Result<Notification, FetchError> {
            self.hit();
            let mut records = self.records.lock().unwrap();
            let slot = records
                .iter_mut()
                .find(|n| n.id == entity.id)
                .ok_or(FetchError::NotFound)?;
            *slot = entity.clone();
            Ok(entity.clone())
        }

        async fn delete(&self, id: &EntityId) -> Result<(), FetchError> {
            self.hit();
            self.records.lock().unwrap().retain(|n| &n.id != id);
            Ok(())
        }
    }

    fn service() -> (CachedEntityService<Notification>, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        fetcher.records.lock().unwrap().push(notification(1, "a"));
        let store = CacheStore::new(
            Arc::new(InMemoryCacheStorage::new()),
            Arc::new(ManualClock::at_epoch()),
        );
        let service = CachedEntityService::new(EntityCache::new(store), fetcher.clone());
        (service, fetcher)
    }

    fn owner(scope: &str) -> OwnerScope {
        OwnerScope::new(scope).unwrap()
    }

    #[tokio::test]
    async fn get_reads_through_once() {
        let (service, fetcher) = service();

        assert!(service.get(&EntityId::Int(1)).await.unwrap().is_some());
        assert!(service.get(&EntityId::Int(1)).await.unwrap().is_some());

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn list_populates_entity_slots() {
        let (service, fetcher) = service();

        service.list(&owner("a"), &QueryFilters::new()).await.unwrap();
        service.get(&EntityId::Int(1)).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn create_invalidates_owner_list() {
        let (service, fetcher) = service();
        service.list(&owner("a"), &QueryFilters::new()).await.unwrap();

        service.create(&notification(2, "a")).await.unwrap();
        let list = service.list(&owner("a"), &QueryFilters::new()).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn update_is_visible_without_refetch() {
        let (service, fetcher) = service();
        service.get(&EntityId::Int(1)).await.unwrap();

        let mut read = notification(1, "a");
        read.status = NotificationStatus::Read;
        service.update(&read).await.unwrap();

        let cached = service.get(&EntityId::Int(1)).await.unwrap().unwrap();
        assert_eq!(cached.status, NotificationStatus::Read);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn delete_evicts_slot() {
        let (service, _fetcher) = service();
        service.get(&EntityId::Int(1)).await.unwrap();

        service.delete(&EntityId::Int(1), &owner("a")).await.unwrap();

        assert!(service.get(&EntityId::Int(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_errors_surface_as_domain_errors() {
        let (service, _fetcher) = service();
        let err = service.stats(&owner("a")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }
}
