//! SyncRuntime - explicit construction and teardown of the sync stack.
//!
//! `init` wires one shared [`RealtimeClient`], one [`CacheStore`] and a
//! [`SyncController`] per configured entity kind, choosing the transport
//! and cache backend from configuration. `dispose` tears everything down
//! in reverse order. Nothing here is global; tests build as many runtimes
//! as they like.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::adapters::auth::{EnvTokenProvider, StaticTokenProvider};
use crate::adapters::cache::{InMemoryCacheStorage, RedisCacheStorage};
use crate::adapters::clock::SystemClock;
use crate::adapters::rest::RestEntityFetcher;
use crate::adapters::transport::{InMemoryServer, InMemoryTransport, WebSocketTransport};
use crate::application::realtime_client::{RealtimeClient, RealtimeClientConfig, ReconnectPolicy};
use crate::application::sync_controller::{SyncController, SyncControllerConfig};
use crate::application::{CacheStore, CacheTtls, CachedEntityService, EntityCache, Supervisor};
use crate::config::{AppConfig, AuthConfig, CacheBackend, TokenSource, TransportKind, ValidationError};
use crate::domain::entity::{Client, Commission, EntityKind, EntityRecord, Notification, QueryFilters, Task};
use crate::domain::foundation::{DomainError, OwnerScope, SyncStatus};
use crate::ports::{AuthTokenProvider, CacheStorage, CacheStorageError, FetchError, NetworkStatus, Transport};

/// How long `dispose` waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Cache backend unavailable: {0}")]
    Storage(#[from] CacheStorageError),

    #[error("Cache backend did not answer within {0:?}")]
    StorageTimeout(Duration),

    #[error("REST client setup failed: {0}")]
    Api(#[from] FetchError),
}

/// Builds the token provider described by `auth`.
pub fn token_provider(auth: &AuthConfig) -> Arc<dyn AuthTokenProvider> {
    match auth.source() {
        TokenSource::Static(token) => Arc::new(StaticTokenProvider::from_secret(Some(token))),
        TokenSource::Env(variable) => Arc::new(EnvTokenProvider::new(variable)),
        TokenSource::None => {
            tracing::warn!("No auth token configured; realtime sync will not connect");
            Arc::new(StaticTokenProvider::new())
        }
    }
}

/// Kind-erased handle over one controller and its REST service.
#[async_trait]
trait ManagedSync: Send + Sync {
    fn kind(&self) -> EntityKind;
    async fn connect(&self) -> Result<bool, DomainError>;
    async fn seed(&self) -> Result<(), DomainError>;
    fn resubscribe(&self);
    fn status(&self) -> watch::Receiver<SyncStatus>;
    fn shutdown(&self);
}

struct Managed<T: EntityRecord> {
    controller: Arc<SyncController<T>>,
    service: Option<CachedEntityService<T>>,
    owner: Option<OwnerScope>,
}

#[async_trait]
impl<T: EntityRecord> ManagedSync for Managed<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    async fn connect(&self) -> Result<bool, DomainError> {
        self.controller.connect().await
    }

    async fn seed(&self) -> Result<(), DomainError> {
        let (Some(service), Some(owner)) = (&self.service, &self.owner) else {
            return Ok(());
        };
        let list = service.list(owner, &QueryFilters::new()).await?;
        tracing::info!(kind = %T::KIND, count = list.len(), "Seeded list from REST");
        self.controller.set_list(list);
        self.controller.set_stats(service.stats(owner).await?);
        Ok(())
    }

    fn resubscribe(&self) {
        self.controller.resubscribe();
    }

    fn status(&self) -> watch::Receiver<SyncStatus> {
        self.controller.status()
    }

    fn shutdown(&self) {
        self.controller.shutdown();
    }
}

/// Shared pieces every controller is built from.
struct Wiring {
    client: RealtimeClient,
    store: CacheStore,
    ttls: CacheTtls,
    auth: Arc<dyn AuthTokenProvider>,
    network: Arc<dyn NetworkStatus>,
    controller_config: SyncControllerConfig,
    api: Option<(Url, Duration)>,
}

impl Wiring {
    fn build<T: EntityRecord>(&self) -> Result<(Arc<SyncController<T>>, Box<dyn ManagedSync>), RuntimeError> {
        let cache = EntityCache::<T>::with_ttls(self.store.clone(), self.ttls);
        let service = match &self.api {
            Some((base, timeout)) => {
                let fetcher = RestEntityFetcher::<T>::new(base.clone(), *timeout, Arc::clone(&self.auth))?;
                Some(CachedEntityService::new(cache.clone(), Arc::new(fetcher)))
            }
            None => None,
        };
        let controller = Arc::new(SyncController::new(
            self.client.clone(),
            cache,
            Arc::clone(&self.auth),
            Arc::clone(&self.network),
            self.controller_config.clone(),
        ));
        let managed: Box<dyn ManagedSync> = Box::new(Managed {
            controller: Arc::clone(&controller),
            service,
            owner: self.controller_config.owner.clone(),
        });
        Ok((controller, managed))
    }
}

pub struct SyncRuntime {
    realtime: RealtimeClient,
    store: CacheStore,
    supervisor: Supervisor,
    managed: Vec<Box<dyn ManagedSync>>,
    clients: Option<Arc<SyncController<Client>>>,
    tasks: Option<Arc<SyncController<Task>>>,
    commissions: Option<Arc<SyncController<Commission>>>,
    notifications: Option<Arc<SyncController<Notification>>>,
    loopback: Option<InMemoryServer>,
}

impl SyncRuntime {
    /// Validates `config` and builds the runtime. Does not connect; call
    /// [`start`](Self::start).
    pub async fn init(
        config: &AppConfig,
        auth: Arc<dyn AuthTokenProvider>,
        network: Arc<dyn NetworkStatus>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let (transport, loopback): (Arc<dyn Transport>, Option<InMemoryServer>) =
            match config.realtime.transport {
                TransportKind::Websocket => (Arc::new(WebSocketTransport::new()), None),
                TransportKind::InMemory => {
                    let (transport, server) = InMemoryTransport::new();
                    (Arc::new(transport), Some(server))
                }
            };

        let realtime_config = RealtimeClientConfig::new(config.realtime.endpoint()?)
            .with_keepalive_interval(config.realtime.keepalive_interval())
            .with_connect_timeout(config.realtime.connect_timeout())
            .with_reconnect(
                ReconnectPolicy::default()
                    .with_max_attempts(config.realtime.max_reconnect_attempts)
                    .with_base_delay(config.realtime.reconnect_base_delay())
                    .with_max_delay(config.realtime.reconnect_max_delay()),
            );
        let realtime = RealtimeClient::new(transport, realtime_config);

        let storage = Self::storage(config).await?;
        let store = CacheStore::new(storage, Arc::new(SystemClock))
            .with_default_ttl(config.cache.default_ttl());

        let supervisor = Supervisor::new();
        if let Some(period) = config.cache.sweep_interval() {
            let sweeper = store.clone();
            let shutdown = supervisor.shutdown_signal();
            supervisor.spawn("cache-sweeper", async move {
                sweeper.run_sweeper(period, shutdown).await;
                Ok(())
            });
        }

        let wiring = Wiring {
            client: realtime.clone(),
            store: store.clone(),
            ttls: CacheTtls {
                entity: config.cache.entity_ttl(),
                list: config.cache.list_ttl(),
                stats: config.cache.stats_ttl(),
            },
            auth,
            network,
            controller_config: SyncControllerConfig {
                status_poll_interval: config.sync.status_poll_interval(),
                owner: config.sync.owner()?,
            },
            api: config.api.base()?.map(|base| (base, config.api.request_timeout())),
        };

        let mut runtime = Self {
            realtime,
            store,
            supervisor,
            managed: Vec::new(),
            clients: None,
            tasks: None,
            commissions: None,
            notifications: None,
            loopback,
        };

        for kind in config.sync.kinds()? {
            let managed = match kind {
                EntityKind::Client => {
                    let (controller, managed) = wiring.build::<Client>()?;
                    runtime.clients = Some(controller);
                    managed
                }
                EntityKind::Task => {
                    let (controller, managed) = wiring.build::<Task>()?;
                    runtime.tasks = Some(controller);
                    managed
                }
                EntityKind::Commission => {
                    let (controller, managed) = wiring.build::<Commission>()?;
                    runtime.commissions = Some(controller);
                    managed
                }
                EntityKind::Notification => {
                    let (controller, managed) = wiring.build::<Notification>()?;
                    runtime.notifications = Some(controller);
                    managed
                }
            };
            runtime.managed.push(managed);
        }

        if let Some(status) = runtime.status() {
            let shutdown = runtime.supervisor.shutdown_signal();
            runtime.supervisor.spawn("status-log", log_status(status, shutdown));
        }

        tracing::info!(
            transport = ?config.realtime.transport,
            cache = ?config.cache.backend,
            kinds = ?runtime.kinds(),
            "Sync runtime initialised"
        );
        Ok(runtime)
    }

    async fn storage(config: &AppConfig) -> Result<Arc<dyn CacheStorage>, RuntimeError> {
        match (config.cache.backend, &config.redis) {
            (CacheBackend::Redis, Some(redis)) => {
                let connected = tokio::time::timeout(redis.timeout(), RedisCacheStorage::connect(&redis.url))
                    .await
                    .map_err(|_| RuntimeError::StorageTimeout(redis.timeout()))??;
                let mut storage = connected.with_namespace(redis.namespace.clone());
                if let Some(expiry) = redis.expiry() {
                    storage = storage.with_expiry(expiry);
                }
                Ok(Arc::new(storage))
            }
            (CacheBackend::Redis, None) => Err(ValidationError::MissingRequired("REDIS__URL").into()),
            (CacheBackend::Memory, _) => Ok(Arc::new(InMemoryCacheStorage::new())),
        }
    }

    /// Seeds local views from REST (when an API and agency are configured)
    /// and connects. Seed failures are logged; the realtime connection is
    /// still attempted. Returns whether a connection was opened.
    pub async fn start(&self) -> Result<bool, DomainError> {
        for managed in &self.managed {
            if let Err(e) = managed.seed().await {
                tracing::warn!(kind = %managed.kind(), error = %e, "Initial REST load failed");
            }
        }

        self.connect().await
    }

    /// Connects the shared client. Every controller registers its
    /// listeners again first, so events of all kinds are delivered even
    /// after an earlier disconnect dropped them.
    pub async fn connect(&self) -> Result<bool, DomainError> {
        for managed in &self.managed {
            managed.resubscribe();
        }
        let mut connected = false;
        for managed in &self.managed {
            connected |= managed.connect().await?;
        }
        Ok(connected)
    }

    /// Closes the shared connection (logout). Controllers keep their
    /// subscriptions for the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.realtime.disconnect();
        for managed in &self.managed {
            managed.resubscribe();
        }
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.managed.iter().map(|m| m.kind()).collect()
    }

    /// Connection status; every controller observes the same client.
    pub fn status(&self) -> Option<watch::Receiver<SyncStatus>> {
        self.managed.first().map(|m| m.status())
    }

    pub fn clients(&self) -> Option<&Arc<SyncController<Client>>> {
        self.clients.as_ref()
    }

    pub fn tasks(&self) -> Option<&Arc<SyncController<Task>>> {
        self.tasks.as_ref()
    }

    pub fn commissions(&self) -> Option<&Arc<SyncController<Commission>>> {
        self.commissions.as_ref()
    }

    pub fn notifications(&self) -> Option<&Arc<SyncController<Notification>>> {
        self.notifications.as_ref()
    }

    /// Server end of the in-memory transport. Only present when
    /// `realtime.transport = in_memory`, and only the first call gets it.
    pub fn take_loopback_server(&mut self) -> Option<InMemoryServer> {
        self.loopback.take()
    }

    /// Unsubscribes controllers, closes the connection and stops
    /// background tasks.
    pub async fn dispose(self) {
        for managed in &self.managed {
            managed.shutdown();
        }
        self.realtime.disconnect();
        self.supervisor.shutdown(SHUTDOWN_GRACE).await;
        tracing::info!("Sync runtime disposed");
    }
}

async fn log_status(
    mut status: watch::Receiver<SyncStatus>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), DomainError> {
    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = *status.borrow_and_update();
                tracing::info!(status = %current, "Realtime status");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}
