use std::path::Path;

use fastrace::trace;
use roster_store::{PersistenceError, RecordStore, StoreOptions};
use roster_types::{NewUser, SortPolicy, StoreStats, User, ViewOutcome, ViewParams};
use roster_view::derive_view;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Published after every successful mutation. Subscribers that keep their
/// own copy of the records should re-read them when they see one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "id", rename_all = "lowercase")]
pub enum RecordEvent {
    Created(u64),
    Updated(u64),
    Deleted(u64),
}

struct RegistryState {
    records: Vec<User>,
    params: ViewParams,
}

/// Owns the record store, the latest record snapshot and the view
/// parameters. Mutations go to the store, then the snapshot is re-read and
/// the view recomputed; parameter changes only recompute.
pub struct Registry {
    store: RecordStore,
    policy: SortPolicy,
    state: RwLock<RegistryState>,
    events: broadcast::Sender<RecordEvent>,
    view_tx: watch::Sender<ViewOutcome>,
}

impl Registry {
    pub fn new(store: RecordStore, policy: SortPolicy, params: ViewParams) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (view_tx, _) = watch::channel(ViewOutcome::default());
        Self {
            store,
            policy,
            state: RwLock::new(RegistryState {
                records: Vec::new(),
                params,
            }),
            events,
            view_tx,
        }
    }

    /// Opens the store at `path` and loads the initial snapshot.
    #[trace]
    pub async fn open(
        path: &Path,
        options: StoreOptions,
        policy: SortPolicy,
        params: ViewParams,
    ) -> Result<Self, RegistryError> {
        let path = path.to_path_buf();
        let store = tokio::task::spawn_blocking(move || RecordStore::open(&path, options)).await??;
        let registry = Self::new(store, policy, params);
        registry.refresh().await?;
        info!("Registry ready with {} records", registry.records().await.len());
        Ok(registry)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ViewOutcome> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ViewOutcome {
        self.view_tx.borrow().clone()
    }

    pub async fn params(&self) -> ViewParams {
        self.state.read().await.params.clone()
    }

    pub async fn records(&self) -> Vec<User> {
        self.state.read().await.records.clone()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    #[trace]
    pub async fn create(&self, user: NewUser) -> Result<User, RegistryError> {
        let created = self.run_store(move |store| store.create(user)).await?;
        self.after_mutation(RecordEvent::Created(created.id)).await;
        Ok(created)
    }

    #[trace]
    pub async fn update(&self, user: User) -> Result<(), RegistryError> {
        let id = user.id;
        self.run_store(move |store| store.update(&user)).await?;
        self.after_mutation(RecordEvent::Updated(id)).await;
        Ok(())
    }

    /// Returns whether a record was actually removed. Deleting an unknown id
    /// still succeeds and still notifies.
    ///
    /// Like `create` and `update`, an error means nothing was written; once
    /// the store commits, the call succeeds even if the view can't be
    /// refreshed.
    #[trace]
    pub async fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let removed = self.run_store(move |store| store.delete(id)).await?;
        self.after_mutation(RecordEvent::Deleted(id)).await;
        Ok(removed)
    }

    pub async fn list_all(&self) -> Result<Vec<User>, RegistryError> {
        self.run_store(|store| store.list_all()).await
    }

    pub async fn get(&self, id: u64) -> Result<Option<User>, RegistryError> {
        self.run_store(move |store| store.get(id)).await
    }

    pub async fn stats(&self) -> Result<StoreStats, RegistryError> {
        self.run_store(|store| store.stats()).await
    }

    /// Re-reads every record and recomputes the view. If the current page
    /// no longer exists it is pulled back to the last one.
    #[trace]
    pub async fn refresh(&self) -> Result<ViewOutcome, RegistryError> {
        let records = self.list_all().await?;
        let mut state = self.state.write().await;
        state.records = records;

        let mut outcome = derive_view(&state.records, &state.params, self.policy);
        if state.params.clamp_page(outcome.total_pages) {
            debug!("Clamped current page to {}", state.params.current_page);
            outcome = derive_view(&state.records, &state.params, self.policy);
        }
        self.view_tx.send_replace(outcome.clone());
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // View parameters
    // ------------------------------------------------------------------------

    pub async fn set_search_term(&self, term: impl Into<String>) -> ViewOutcome {
        let term = term.into();
        self.update_params(|params| params.search_term = term).await
    }

    pub async fn toggle_creation_order(&self) -> ViewOutcome {
        self.update_params(|params| params.sort.toggle_creation()).await
    }

    pub async fn toggle_age_order(&self) -> ViewOutcome {
        self.update_params(|params| params.sort.toggle_age()).await
    }

    pub async fn toggle_name_order(&self) -> ViewOutcome {
        self.update_params(|params| params.sort.toggle_name()).await
    }

    pub async fn set_current_page(&self, page: usize) -> ViewOutcome {
        self.update_params(|params| params.current_page = page).await
    }

    pub async fn set_page_size(&self, page_size: usize) -> ViewOutcome {
        self.update_params(|params| params.set_page_size(page_size)).await
    }

    pub async fn next_page(&self) -> ViewOutcome {
        let total_pages = self.view_tx.borrow().total_pages;
        self.update_params(|params| params.next_page(total_pages)).await
    }

    pub async fn prev_page(&self) -> ViewOutcome {
        self.update_params(|params| params.prev_page()).await
    }

    pub async fn set_params(&self, new_params: ViewParams) -> ViewOutcome {
        self.update_params(|params| *params = new_params).await
    }

    async fn update_params<F>(&self, change: F) -> ViewOutcome
    where
        F: FnOnce(&mut ViewParams),
    {
        let mut state = self.state.write().await;
        change(&mut state.params);
        let outcome = derive_view(&state.records, &state.params, self.policy);
        self.view_tx.send_replace(outcome.clone());
        outcome
    }

    // The mutation has already committed by the time this runs, so a failed
    // refresh only leaves the view stale until the next one.
    async fn after_mutation(&self, event: RecordEvent) {
        debug!("Record event {:?}", event);
        // No subscribers is fine.
        let _ = self.events.send(event);
        if let Err(e) = self.refresh().await {
            warn!("Refresh after {:?} failed, view is stale: {}", event, e);
        }
    }

    async fn run_store<T, F>(&self, op: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&RecordStore) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || op(&store)).await?;
        result.map_err(|e| {
            warn!("Store operation failed: {}", e);
            RegistryError::Persistence(e)
        })
    }
}
