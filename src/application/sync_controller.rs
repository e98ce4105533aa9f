//! SyncController - keeps one entity kind's local view in step with the server.
//!
//! The controller subscribes to `<kind>_created`, `<kind>_updated`,
//! `<kind>_deleted` and `stats_update` on the shared [`RealtimeClient`].
//! Listeners only forward frames into a channel; a single task applies
//! them in arrival order, updating the in-memory view (list, detail, stats)
//! and invalidating the [`EntityCache`] exactly like a local write would.
//!
//! It also owns the UI-facing [`SyncStatus`]: the client's connection state
//! is polled on a fixed period and published on a watch channel, stepping
//! through intermediate states when the poll missed a transition.
//!
//! # Network awareness
//!
//! Going offline pauses scheduled reconnects and blocks `connect`. Coming
//! back online resumes them and reconnects with a fresh token from the
//! [`AuthTokenProvider`] (or the client's last token if the provider fails).

use secrecy::SecretString;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::application::realtime_client::{MessageListener, RealtimeClient};
use crate::application::EntityCache;
use crate::domain::entity::{EntityRecord, StatsSnapshot};
use crate::domain::foundation::{
    DomainError, EntityId, ErrorCode, ListenerId, OwnerScope, StateMachine, SyncStatus,
};
use crate::domain::realtime::{
    decode_entity, DeletePayload, ListenerChannel, MessageType, StatsPayload, TransportMessage,
};
use crate::ports::{AuthTokenProvider, NetworkStatus};

/// How often the connection state is sampled for the status indicator.
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SyncControllerConfig {
    pub status_poll_interval: Duration,
    /// When set, created entities and stats updates for other owners do
    /// not touch the local view. Cache invalidation still happens.
    pub owner: Option<OwnerScope>,
}

impl Default for SyncControllerConfig {
    fn default() -> Self {
        Self {
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            owner: None,
        }
    }
}

impl SyncControllerConfig {
    pub fn for_owner(owner: OwnerScope) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn with_status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }
}

type EntityHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type DeleteHook = Arc<dyn Fn(&EntityId) + Send + Sync>;
type StatsHook = Arc<dyn Fn(&StatsSnapshot) + Send + Sync>;

struct Hooks<T> {
    created: Vec<EntityHook<T>>,
    updated: Vec<EntityHook<T>>,
    deleted: Vec<DeleteHook>,
    stats: Vec<StatsHook>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            stats: Vec::new(),
        }
    }
}

/// What the UI currently renders for this kind.
struct LocalView<T> {
    list: Vec<T>,
    detail: Option<T>,
    stats: StatsSnapshot,
}

impl<T> Default for LocalView<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            detail: None,
            stats: StatsSnapshot::new(),
        }
    }
}

/// Forwards matching frames to the apply task.
struct ForwardListener {
    name: String,
    tx: mpsc::UnboundedSender<TransportMessage>,
}

impl MessageListener for ForwardListener {
    fn on_message(&self, message: &TransportMessage) -> Result<(), DomainError> {
        self.tx.send(message.clone()).map_err(|_| {
            DomainError::new(ErrorCode::InternalError, "sync controller stopped")
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct ControllerInner<T: EntityRecord> {
    client: RealtimeClient,
    cache: EntityCache<T>,
    auth: Arc<dyn AuthTokenProvider>,
    network: Arc<dyn NetworkStatus>,
    config: SyncControllerConfig,
    view: RwLock<LocalView<T>>,
    hooks: RwLock<Hooks<T>>,
    status: watch::Sender<SyncStatus>,
    events: mpsc::UnboundedSender<TransportMessage>,
    subscriptions: Mutex<Vec<(ListenerChannel, ListenerId)>>,
    applied: AtomicU64,
}

/// Realtime synchronization for entities of kind `T`.
///
/// Must be created inside a Tokio runtime. Dropping the controller (or
/// calling [`shutdown`](Self::shutdown)) unsubscribes its listeners and
/// stops its background tasks.
pub struct SyncController<T: EntityRecord> {
    inner: Arc<ControllerInner<T>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: EntityRecord> SyncController<T> {
    pub fn new(
        client: RealtimeClient,
        cache: EntityCache<T>,
        auth: Arc<dyn AuthTokenProvider>,
        network: Arc<dyn NetworkStatus>,
        config: SyncControllerConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = SyncStatus::from(client.connection_state());
        let (status, _) = watch::channel(initial);
        let poll_interval = config.status_poll_interval;

        let inner = Arc::new(ControllerInner {
            client,
            cache,
            auth,
            network,
            config,
            view: RwLock::new(LocalView::default()),
            hooks: RwLock::new(Hooks::default()),
            status,
            events: events_tx,
            subscriptions: Mutex::new(Vec::new()),
            applied: AtomicU64::new(0),
        });
        inner.ensure_subscribed();

        let online = inner.network.subscribe();
        let resets = inner.client.listener_resets();
        let tasks = vec![
            tokio::spawn(Arc::clone(&inner).apply_loop(events_rx)),
            tokio::spawn(Arc::clone(&inner).status_loop(poll_interval)),
            tokio::spawn(Arc::clone(&inner).network_loop(online)),
            tokio::spawn(Arc::clone(&inner).resubscribe_loop(resets)),
        ];

        tracing::debug!(kind = %T::KIND, "Sync controller started");
        Self {
            inner,
            tasks: Mutex::new(tasks),
        }
    }

    /// Connects the shared client with the current auth token.
    ///
    /// Returns `Ok(false)` without connecting while offline or signed out.
    pub async fn connect(&self) -> Result<bool, DomainError> {
        self.inner.connect().await
    }

    /// Disconnects the shared client.
    ///
    /// The client drops every listener on disconnect, including those of
    /// other controllers sharing it; each controller registers again as
    /// soon as it sees the reset, and at the latest on its next
    /// [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.inner.client.disconnect();
        self.inner.refresh_status();
    }

    /// Registers the forwarding listeners again if the client lost them.
    pub fn resubscribe(&self) {
        self.inner.ensure_subscribed();
    }

    pub fn client(&self) -> &RealtimeClient {
        &self.inner.client
    }

    pub fn cache(&self) -> &EntityCache<T> {
        &self.inner.cache
    }

    /// Subscribes to the Live/Connecting/Offline status.
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn current_status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    pub fn list(&self) -> Vec<T> {
        self.inner.view().list.clone()
    }

    pub fn detail(&self) -> Option<T> {
        self.inner.view().detail.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.view().stats.clone()
    }

    /// Seeds the list view, typically from a REST load.
    pub fn set_list(&self, entities: Vec<T>) {
        self.inner.view_mut().list = entities;
    }

    /// Sets (or clears) the entity shown in the detail view.
    pub fn set_detail(&self, entity: Option<T>) {
        self.inner.view_mut().detail = entity;
    }

    pub fn set_stats(&self, stats: StatsSnapshot) {
        self.inner.view_mut().stats = stats;
    }

    /// Reads an entity from the cache, bypassing the local view.
    pub async fn cached_entity(&self, id: &EntityId) -> Option<T> {
        self.inner.cache.get(id).await
    }

    pub fn on_entity_created(&self, hook: impl Fn(&T) + Send + Sync + 'static) {
        self.inner.hooks_mut().created.push(Arc::new(hook));
    }

    pub fn on_entity_updated(&self, hook: impl Fn(&T) + Send + Sync + 'static) {
        self.inner.hooks_mut().updated.push(Arc::new(hook));
    }

    pub fn on_entity_deleted(&self, hook: impl Fn(&EntityId) + Send + Sync + 'static) {
        self.inner.hooks_mut().deleted.push(Arc::new(hook));
    }

    pub fn on_stats_update(&self, hook: impl Fn(&StatsSnapshot) + Send + Sync + 'static) {
        self.inner.hooks_mut().stats.push(Arc::new(hook));
    }

    /// Applies one frame immediately, outside the ordered event queue.
    ///
    /// Frames for other kinds and non-mutation frames are ignored.
    pub async fn handle_message(&self, message: &TransportMessage) -> Result<(), DomainError> {
        self.inner.handle_message(message).await
    }

    /// Number of queued frames the apply task has processed.
    pub fn applied_count(&self) -> u64 {
        self.inner.applied.load(Ordering::Acquire)
    }

    /// Unsubscribes from the client and stops background tasks. Idempotent.
    pub fn shutdown(&self) {
        self.inner.unsubscribe();
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        tracing::debug!(kind = %T::KIND, "Sync controller stopped");
    }
}

impl<T: EntityRecord> Drop for SyncController<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: EntityRecord> ControllerInner<T> {
    fn view(&self) -> RwLockReadGuard<'_, LocalView<T>> {
        self.view.read().unwrap_or_else(|e| e.into_inner())
    }

    fn view_mut(&self) -> RwLockWriteGuard<'_, LocalView<T>> {
        self.view.write().unwrap_or_else(|e| e.into_inner())
    }

    fn hooks(&self) -> RwLockReadGuard<'_, Hooks<T>> {
        self.hooks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn hooks_mut(&self) -> RwLockWriteGuard<'_, Hooks<T>> {
        self.hooks.write().unwrap_or_else(|e| e.into_inner())
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<(ListenerChannel, ListenerId)>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn channels() -> [ListenerChannel; 4] {
        [
            MessageType::Created(T::KIND).into(),
            MessageType::Updated(T::KIND).into(),
            MessageType::Deleted(T::KIND).into(),
            MessageType::StatsUpdate.into(),
        ]
    }

    /// Registers the forwarding listeners unless all of them are still in
    /// place. `RealtimeClient::disconnect` clears every listener.
    fn ensure_subscribed(&self) {
        let mut subscriptions = self.subscriptions();
        let intact = !subscriptions.is_empty()
            && subscriptions
                .iter()
                .all(|(_, id)| self.client.has_listener(*id));
        if intact {
            return;
        }

        for (channel, id) in subscriptions.drain(..) {
            self.client.off(channel, id);
        }
        for channel in Self::channels() {
            let listener = ForwardListener {
                name: format!("sync:{}", channel),
                tx: self.events.clone(),
            };
            let id = self.client.on(channel.clone(), listener);
            subscriptions.push((channel, id));
        }
        tracing::debug!(kind = %T::KIND, "Sync listeners registered");
    }

    fn unsubscribe(&self) {
        for (channel, id) in self.subscriptions().drain(..) {
            self.client.off(channel, id);
        }
    }

    async fn connect(&self) -> Result<bool, DomainError> {
        if !self.network.is_online() {
            tracing::debug!(kind = %T::KIND, "Offline, not connecting");
            return Ok(false);
        }

        let token = match self.auth.auth_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!(kind = %T::KIND, "No auth token, not connecting");
                return Ok(false);
            }
            Err(e) => match self.client.last_token() {
                Some(token) => {
                    tracing::warn!(error = %e, "Auth token lookup failed, reusing last token");
                    token
                }
                None => return Err(e),
            },
        };

        self.ensure_subscribed();
        let result = self.open(token).await;
        self.refresh_status();
        result.map(|()| true)
    }

    async fn open(&self, token: SecretString) -> Result<(), DomainError> {
        Ok(self.client.connect(token).await?)
    }

    /// Publishes the client's state, walking through any state the poll
    /// skipped so that subscribers only ever observe valid transitions.
    /// Returns the statuses published, in order.
    fn refresh_status(&self) -> Vec<SyncStatus> {
        let observed = SyncStatus::from(self.client.connection_state());
        let mut published = Vec::new();
        loop {
            let current = *self.status.borrow();
            if current == observed {
                return published;
            }
            let next = if current.can_transition_to(&observed) {
                observed
            } else if current == SyncStatus::Disconnected {
                SyncStatus::Connecting
            } else {
                SyncStatus::Disconnected
            };
            tracing::debug!(kind = %T::KIND, from = %current, to = %next, "Sync status changed");
            self.status.send_replace(next);
            published.push(next);
        }
    }

    async fn apply_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransportMessage>) {
        while let Some(message) = events.recv().await {
            if let Err(e) = self.handle_message(&message).await {
                tracing::warn!(
                    kind = %T::KIND,
                    message_type = %message.message_type,
                    error = %e,
                    "Failed to apply realtime event"
                );
            }
            self.applied.fetch_add(1, Ordering::AcqRel);
        }
    }

    async fn status_loop(self: Arc<Self>, period: Duration) {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.refresh_status();
        }
    }

    async fn resubscribe_loop(self: Arc<Self>, mut resets: watch::Receiver<u64>) {
        while resets.changed().await.is_ok() {
            self.ensure_subscribed();
        }
    }

    async fn network_loop(self: Arc<Self>, mut online: watch::Receiver<bool>) {
        let mut last = *online.borrow_and_update();
        self.client.set_reconnect_paused(!last);

        while online.changed().await.is_ok() {
            let now = *online.borrow_and_update();
            if now == last {
                continue;
            }
            last = now;

            if now {
                tracing::info!(kind = %T::KIND, "Network online, resuming realtime sync");
                self.client.set_reconnect_paused(false);
                if let Err(e) = self.connect().await {
                    tracing::warn!(kind = %T::KIND, error = %e, "Reconnect after network recovery failed");
                }
            } else {
                tracing::info!(kind = %T::KIND, "Network offline, pausing reconnects");
                self.client.set_reconnect_paused(true);
            }
        }
    }

    async fn handle_message(&self, message: &TransportMessage) -> Result<(), DomainError> {
        match &message.message_type {
            MessageType::Created(kind) if *kind == T::KIND => {
                let entity: T = decode_entity(T::KIND, &message.data)?;
                self.apply_created(entity).await;
            }
            MessageType::Updated(kind) if *kind == T::KIND => {
                let entity: T = decode_entity(T::KIND, &message.data)?;
                self.apply_updated(entity).await;
            }
            MessageType::Deleted(kind) if *kind == T::KIND => {
                let payload = DeletePayload::from_data(T::KIND, &message.data)?;
                self.apply_deleted(payload).await;
            }
            MessageType::StatsUpdate => {
                let payload = StatsPayload::from_data(&message.data)?;
                self.apply_stats(payload).await;
            }
            _ => {}
        }
        Ok(())
    }

    fn in_scope(&self, owner: &OwnerScope) -> bool {
        self.config.owner.as_ref().map_or(true, |scope| scope == owner)
    }

    async fn apply_created(&self, entity: T) {
        let id = entity.entity_id();
        if self.in_scope(entity.owner_scope()) {
            let mut view = self.view_mut();
            view.list.retain(|existing| existing.entity_id() != id);
            view.list.insert(0, entity.clone());
        }

        self.cache.apply_create(&entity).await;
        tracing::debug!(kind = %T::KIND, id = %id, "Applied realtime create");

        let hooks = self.hooks().created.clone();
        run_hooks("created", &hooks, &entity);
    }

    async fn apply_updated(&self, entity: T) {
        let id = entity.entity_id();
        {
            let mut guard = self.view_mut();
            let view = &mut *guard;
            let local = view
                .list
                .iter()
                .chain(view.detail.iter())
                .find(|existing| existing.entity_id() == id);
            if let Some(local) = local {
                if entity.updated_at().is_before(&local.updated_at()) {
                    tracing::debug!(kind = %T::KIND, id = %id, "Ignoring stale realtime update");
                    return;
                }
            }

            for slot in view.list.iter_mut().filter(|e| e.entity_id() == id) {
                *slot = entity.clone();
            }
            if let Some(detail) = view.detail.as_mut().filter(|d| d.entity_id() == id) {
                *detail = entity.clone();
            }
        }

        self.cache.apply_update(&entity).await;
        tracing::debug!(kind = %T::KIND, id = %id, "Applied realtime update");

        let hooks = self.hooks().updated.clone();
        run_hooks("updated", &hooks, &entity);
    }

    async fn apply_deleted(&self, payload: DeletePayload) {
        let id = payload.id;
        let local_owner = {
            let view = self.view();
            view.list
                .iter()
                .chain(view.detail.iter())
                .find(|existing| existing.entity_id() == id)
                .map(|existing| existing.owner_scope().clone())
        };
        let owner = match payload.owner.or(local_owner) {
            Some(owner) => Some(owner),
            None => self
                .cache
                .get(&id)
                .await
                .map(|cached| cached.owner_scope().clone()),
        };

        {
            let mut view = self.view_mut();
            view.list.retain(|existing| existing.entity_id() != id);
            if view.detail.as_ref().is_some_and(|d| d.entity_id() == id) {
                view.detail = None;
            }
        }

        self.cache.invalidate_on_delete(&id, owner.as_ref()).await;
        tracing::debug!(kind = %T::KIND, id = %id, owner = ?owner, "Applied realtime delete");

        let hooks = self.hooks().deleted.clone();
        run_hooks("deleted", &hooks, &id);
    }

    async fn apply_stats(&self, payload: StatsPayload) {
        if !payload.applies_to(T::KIND) {
            return;
        }

        self.cache.invalidate_stats(payload.owner.as_ref()).await;

        if let Some(owner) = &payload.owner {
            if !self.in_scope(owner) {
                return;
            }
        }

        let snapshot = {
            let mut view = self.view_mut();
            view.stats.merge(&payload.fields);
            view.stats.clone()
        };

        let hooks = self.hooks().stats.clone();
        run_hooks("stats_update", &hooks, &snapshot);
    }
}

fn run_hooks<A: ?Sized>(event: &str, hooks: &[Arc<dyn Fn(&A) + Send + Sync>], arg: &A) {
    for hook in hooks {
        if catch_unwind(AssertUnwindSafe(|| hook(arg))).is_err() {
            tracing::error!(event, "Sync hook panicked");
        }
    }
}
