use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;

use crate::database::{LibraryStore, StorageError};

pub mod cache;
pub mod catalog;
pub mod sources;
pub mod title;


use cache::SubscriptionCache;
use catalog::{CatalogSnapshot, SubscriptionFlags};
use sources::{CatalogFetchers, Provider};
use title::TitleMatcher;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubscriptionError {
    #[error("storage failed during refresh: {0}")]
    Storage(#[from] StorageError),
    #[error("refresh task failed: {0}")]
    Task(String),
    #[error("subscription data unavailable: {0}")]
    Unavailable(#[source] Box<SubscriptionError>),
}

type InitHandle = Shared<BoxFuture<'static, Result<(), SubscriptionError>>>;

/// Lazy first refresh. Concurrent callers during `Initializing` all await
/// the same handle.
enum InitState {
    Uninitialized,
    Initializing(InitHandle),
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Ready,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSizes {
    pub game_pass: usize,
    pub ps_plus: usize,
    pub geforce_now: usize,
}

impl CatalogSizes {
    fn of(snapshot: &CatalogSnapshot) -> Self {
        Self {
            game_pass: snapshot.game_pass.len(),
            ps_plus: snapshot.ps_plus.len(),
            geforce_now: snapshot.geforce_now.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedProvider {
    pub provider: Provider,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub updated_at: DateTime<Utc>,
    pub catalogs: CatalogSizes,
    pub degraded: Vec<DegradedProvider>,
    pub games_processed: usize,
    pub games_matched: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub state: InitPhase,
    pub last_updated: Option<DateTime<Utc>>,
    pub catalogs: CatalogSizes,
    pub cached_titles: usize,
}

struct Inner {
    fetchers: CatalogFetchers,
    storage: Arc<dyn LibraryStore>,
    matcher: Arc<dyn TitleMatcher>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    cache: RwLock<SubscriptionCache>,
    init: Mutex<InitState>,
}

/// Owns the provider catalogs and the per-game cache. Clones share state.
#[derive(Clone)]
pub struct SubscriptionService {
    inner: Arc<Inner>,
}

impl SubscriptionService {
    pub fn new(
        fetchers: CatalogFetchers,
        storage: Arc<dyn LibraryStore>,
        matcher: Arc<dyn TitleMatcher>,
        cache_ttl: chrono::Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetchers,
                storage,
                matcher,
                snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
                cache: RwLock::new(SubscriptionCache::new(cache_ttl)),
                init: Mutex::new(InitState::Uninitialized),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&read(&self.inner.snapshot))
    }

    /// Start a full refresh unless one is already in flight, then wait for it.
    pub async fn initialize(&self) -> Result<(), SubscriptionError> {
        self.join_initialization(true).await
    }

    /// Initialize on first use only.
    pub async fn ensure_initialized(&self) -> Result<(), SubscriptionError> {
        self.join_initialization(false).await
    }

    async fn join_initialization(&self, restart_when_ready: bool) -> Result<(), SubscriptionError> {
        let handle = {
            let mut state = lock(&self.inner.init);
            match &*state {
                InitState::Ready if !restart_when_ready => return Ok(()),
                // a restart is in flight but the catalogs are already usable
                InitState::Initializing(_) if !restart_when_ready && self.inner.is_loaded() => return Ok(()),
                InitState::Initializing(handle) => handle.clone(),
                InitState::Uninitialized | InitState::Ready => {
                    let handle = self.spawn_initialization();
                    *state = InitState::Initializing(handle.clone());
                    handle
                }
            }
        };

        handle.await
    }

    // Must be called with the init lock held so the task cannot settle
    // before its handle is stored.
    fn spawn_initialization(&self) -> InitHandle {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = inner.refresh().await.map(|_| ());

            if let Err(e) = &result {
                tracing::error!(error = %e, "subscription initialization failed");
            }

            *lock(&inner.init) = match result {
                Ok(()) => InitState::Ready,
                Err(_) => inner.settled_state(),
            };

            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    *lock(&inner.init) = inner.settled_state();
                    Err(SubscriptionError::Task(e.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Flags for one catalog game, served from the cache while fresh.
    #[tracing::instrument(skip(self))]
    pub async fn check_game_subscriptions_by_id(
        &self,
        igdb_id: i64,
        title: &str,
    ) -> Result<SubscriptionFlags, SubscriptionError> {
        if let Err(e) = self.ensure_initialized().await {
            let stale = read(&self.inner.cache).get(igdb_id).map(|entry| entry.flags);

            return match stale {
                Some(flags) => {
                    tracing::warn!(error = %e, "serving cached flags, subscription data unavailable");
                    Ok(flags)
                }
                None => Err(SubscriptionError::Unavailable(Box::new(e))),
            };
        }

        let now = Utc::now();
        let fresh = read(&self.inner.cache).get_fresh(igdb_id, now);
        if let Some(flags) = fresh {
            tracing::debug!("cache hit");
            return Ok(flags);
        }

        let flags = self.compute_flags(title);
        write(&self.inner.cache).insert(igdb_id, flags, now);

        Ok(flags)
    }

    pub fn compute_flags(&self, title: &str) -> SubscriptionFlags {
        self.snapshot().compute_flags(title, self.inner.matcher.as_ref())
    }

    /// Forced full refresh, independent of cache freshness.
    pub async fn update_subscription_data(&self) -> Result<RefreshSummary, SubscriptionError> {
        let summary = self.inner.refresh().await?;

        let mut state = lock(&self.inner.init);
        if matches!(*state, InitState::Uninitialized) {
            *state = InitState::Ready;
        }

        Ok(summary)
    }

    pub fn status(&self) -> ServiceStatus {
        let state = match &*lock(&self.inner.init) {
            InitState::Uninitialized => InitPhase::Uninitialized,
            InitState::Initializing(_) => InitPhase::Initializing,
            InitState::Ready => InitPhase::Ready,
        };
        let snapshot = self.snapshot();

        ServiceStatus {
            state,
            last_updated: snapshot.last_updated,
            catalogs: CatalogSizes::of(&snapshot),
            cached_titles: read(&self.inner.cache).len(),
        }
    }
}

impl Inner {
    fn is_loaded(&self) -> bool {
        read(&self.snapshot).last_updated.is_some()
    }

    /// State after a failed refresh. Catalogs from an earlier success stay in service.
    fn settled_state(&self) -> InitState {
        if self.is_loaded() {
            InitState::Ready
        } else {
            InitState::Uninitialized
        }
    }

    #[tracing::instrument(name = "refresh", skip_all)]
    async fn refresh(&self) -> Result<RefreshSummary, SubscriptionError> {
        tracing::info!("starting subscription catalog update");
        let started = Instant::now();

        let fetch = self.fetchers.fetch_all().await;

        let degraded: Vec<DegradedProvider> = Provider::ALL
            .into_iter()
            .filter_map(|provider| {
                fetch.outcome(provider).degraded_reason().map(|e| DegradedProvider {
                    provider,
                    reason: e.to_string(),
                })
            })
            .collect();

        let updated_at = Utc::now();
        let snapshot = Arc::new(CatalogSnapshot {
            game_pass: fetch.game_pass.into_entries(),
            ps_plus: fetch.ps_plus.into_entries(),
            geforce_now: fetch.geforce_now.into_entries(),
            last_updated: Some(updated_at),
        });
        let catalogs = CatalogSizes::of(&snapshot);

        tracing::info!(
            game_pass = catalogs.game_pass,
            ps_plus = catalogs.ps_plus,
            geforce_now = catalogs.geforce_now,
            degraded = degraded.len(),
            "fetched catalogs"
        );

        let games = self.storage.list_distinct_library_games().await?;
        tracing::info!(count = games.len(), "matching against library games");

        let previous = std::mem::replace(&mut *write(&self.snapshot), Arc::clone(&snapshot));

        let mut games_matched = 0;
        for game in &games {
            let flags = snapshot.compute_flags(&game.name, self.matcher.as_ref());

            if let Err(e) = self.storage.write_subscription_flags(game.igdb_id, flags.into()).await {
                tracing::error!(igdb_id = game.igdb_id, error = %e, "failed to write subscription flags");
                self.restore_snapshot(&snapshot, previous);
                return Err(e.into());
            }

            if flags.any() {
                games_matched += 1;
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            matched = games_matched,
            total = games.len(),
            elapsed_ms,
            "subscription update complete"
        );

        Ok(RefreshSummary {
            updated_at,
            catalogs,
            degraded,
            games_processed: games.len(),
            games_matched,
            elapsed_ms,
        })
    }

    /// Put `previous` back unless a later refresh already replaced `ours`.
    fn restore_snapshot(&self, ours: &Arc<CatalogSnapshot>, previous: Arc<CatalogSnapshot>) {
        let mut current = write(&self.snapshot);
        if Arc::ptr_eq(&current, ours) {
            *current = previous;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
