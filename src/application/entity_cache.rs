//! EntityCache - typed cache partitions for one record kind, with the
//! invalidation rules tied to mutation events.
//!
//! | Event  | Entity slot                | Lists                 | Stats                 |
//! |--------|----------------------------|-----------------------|-----------------------|
//! | create | written (`apply_create`)   | creating owner only   | creating owner only   |
//! | update | written (`apply_update`)   | every owner           | every owner           |
//! | delete | evicted                    | owner (or every owner)| owner (or every owner)|
//!
//! The `invalidate_on_*` variants only evict; the slot is left alone on
//! create and dropped on update.

use std::marker::PhantomData;
use std::time::Duration;

use crate::application::cache_keys;
use crate::application::CacheStore;
use crate::domain::entity::{EntityRecord, QueryFilters, StatsSnapshot};
use crate::domain::foundation::{EntityId, OwnerScope};

/// TTLs per cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Default: 5 minutes
    pub entity: Duration,
    /// Default: 2 minutes
    pub list: Duration,
    /// Default: 1 minute
    pub stats: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            entity: Duration::from_secs(5 * 60),
            list: Duration::from_secs(2 * 60),
            stats: Duration::from_secs(60),
        }
    }
}

pub struct EntityCache<T> {
    store: CacheStore,
    ttls: CacheTtls,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttls: self.ttls,
            _record: PhantomData,
        }
    }
}

impl<T: EntityRecord> EntityCache<T> {
    pub fn new(store: CacheStore) -> Self {
        Self::with_ttls(store, CacheTtls::default())
    }

    pub fn with_ttls(store: CacheStore, ttls: CacheTtls) -> Self {
        Self {
            store,
            ttls,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn get(&self, id: &EntityId) -> Option<T> {
        self.store.get(&cache_keys::entity_key(T::KIND, id)).await
    }

    pub async fn put(&self, entity: &T) {
        let key = cache_keys::entity_key(T::KIND, &entity.entity_id());
        self.store.set_with_ttl(&key, entity, self.ttls.entity).await;
    }

    pub async fn get_list(&self, owner: &OwnerScope, filters: &QueryFilters) -> Option<Vec<T>> {
        self.store
            .get(&cache_keys::list_key(T::KIND, owner, filters))
            .await
    }

    /// Caches a list result and writes every contained record through to
    /// its entity slot.
    pub async fn put_list(&self, owner: &OwnerScope, filters: &QueryFilters, entities: &[T]) {
        let key = cache_keys::list_key(T::KIND, owner, filters);
        self.store.set_with_ttl(&key, entities, self.ttls.list).await;
        for entity in entities {
            self.put(entity).await;
        }
    }

    pub async fn get_stats(&self, owner: &OwnerScope) -> Option<StatsSnapshot> {
        self.store.get(&cache_keys::stats_key(T::KIND, owner)).await
    }

    pub async fn put_stats(&self, owner: &OwnerScope, stats: &StatsSnapshot) {
        let key = cache_keys::stats_key(T::KIND, owner);
        self.store.set_with_ttl(&key, stats, self.ttls.stats).await;
    }

    /// A record was created by `entity.owner_scope()`.
    pub async fn invalidate_on_create(&self, entity: &T) {
        let owner = entity.owner_scope();
        self.store
            .remove_prefix(&cache_keys::owner_list_prefix(T::KIND, owner))
            .await;
        self.store.remove(&cache_keys::stats_key(T::KIND, owner)).await;
    }

    /// [`invalidate_on_create`](Self::invalidate_on_create) plus writing
    /// the new record into its slot.
    pub async fn apply_create(&self, entity: &T) {
        self.invalidate_on_create(entity).await;
        self.put(entity).await;
    }

    /// A record changed: its slot and every list/stats cache of the kind
    /// are stale.
    pub async fn invalidate_on_update(&self, id: &EntityId) {
        self.store.remove(&cache_keys::entity_key(T::KIND, id)).await;
        self.evict_kind_aggregates().await;
    }

    /// Like [`invalidate_on_update`](Self::invalidate_on_update), but keeps
    /// the slot warm with the new version.
    pub async fn apply_update(&self, entity: &T) {
        self.put(entity).await;
        self.evict_kind_aggregates().await;
    }

    /// A record was deleted. Without a known owner every list/stats cache
    /// of the kind is evicted.
    pub async fn invalidate_on_delete(&self, id: &EntityId, owner: Option<&OwnerScope>) {
        self.store.remove(&cache_keys::entity_key(T::KIND, id)).await;
        match owner {
            Some(owner) => {
                self.store
                    .remove_prefix(&cache_keys::owner_list_prefix(T::KIND, owner))
                    .await;
                self.store.remove(&cache_keys::stats_key(T::KIND, owner)).await;
            }
            None => self.evict_kind_aggregates().await,
        }
    }

    /// Stats changed server-side for `owner` (or for unknown owners).
    pub async fn invalidate_stats(&self, owner: Option<&OwnerScope>) {
        match owner {
            Some(owner) => self.store.remove(&cache_keys::stats_key(T::KIND, owner)).await,
            None => {
                self.store.remove_prefix(&cache_keys::stats_prefix(T::KIND)).await;
            }
        }
    }

    async fn evict_kind_aggregates(&self) {
        self.store.remove_prefix(&cache_keys::list_prefix(T::KIND)).await;
        self.store.remove_prefix(&cache_keys::stats_prefix(T::KIND)).await;
    }
}
