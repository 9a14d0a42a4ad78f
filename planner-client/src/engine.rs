//! Optimistic to-do mutations reconciled against the remote source, with the
//! local cache catching everything the remote cannot confirm.
//!
//! Every public operation is infallible from the caller's side. Remote and
//! storage errors end in one of the [`Commit`] states and, where the change
//! could only be kept on this device, a [`TodoEvent::StoredLocally`]
//! advisory.
//!
//! [`TodoEvent::StoredLocally`]: crate::events::TodoEvent::StoredLocally

use chrono::{DateTime, Utc};
use planner_core::{
    map_remote_records, prefer_cached, ChangeStatusRequest, DateKey, SyncResult, TaskId, TaskItem,
    TaskStatus, TimeSlot, UpdateTaskRequest, UserSession,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::TaskBackend;
use crate::cache::LocalCacheStore;
use crate::config::ClientConfig;
use crate::database::ClientDatabase;
use crate::events::{Advisory, EventDispatcher};
use crate::gateway::TaskGateway;
use crate::session::{Clock, SelectionContext, SystemClock};

/// The state a mutation settled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Remote accepted the change and the list was re-fetched from it.
    Authoritative,
    /// Remote failed; the optimistic list was written to the cache.
    CacheFallback,
    /// Remote was not eligible (placeholder item or a day other than today);
    /// the change lives in the cache only.
    Unsynced,
    /// Local mode; the cache is the source of truth.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyTitle,
    UnknownTask(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Committed(Commit),
    Rejected(Rejection),
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }
}

#[derive(Debug, Clone)]
enum Intent {
    Add { title: String },
    Toggle { id: TaskId, time_slot: Option<TimeSlot> },
    Rename { id: TaskId, title: String },
    Remove { id: TaskId },
}

#[derive(Debug, Clone)]
enum Applied {
    Added(TaskItem),
    Toggled {
        id: TaskId,
        done: bool,
        time_slot: Option<TimeSlot>,
    },
    Renamed {
        id: TaskId,
        title: String,
        time_slot: Option<TimeSlot>,
    },
    Removed {
        id: TaskId,
    },
}

impl Applied {
    fn advisory(&self) -> Advisory {
        match self {
            Applied::Added(_) => Advisory::SaveFailed,
            Applied::Toggled { .. } | Applied::Renamed { .. } => Advisory::ApplyFailed,
            Applied::Removed { .. } => Advisory::DeleteFailed,
        }
    }

    /// The gateway call for this change, or `None` when the item has no
    /// server id to address.
    fn remote_call(&self, date: &DateKey) -> Option<RemoteCall> {
        let anchor = |slot: &Option<TimeSlot>| {
            slot.map(|s| (date.anchor(s.start_time), date.anchor(s.end_time)))
                .unzip()
        };

        match self {
            Applied::Added(item) => Some(RemoteCall::Create {
                title: item.title.clone(),
            }),
            Applied::Toggled {
                id,
                done,
                time_slot,
            } => {
                let (start_time, end_time) = anchor(time_slot);
                Some(RemoteCall::ChangeStatus(ChangeStatusRequest {
                    id: id.remote_id()?,
                    status: TaskStatus::from_done(*done),
                    start_time,
                    end_time,
                }))
            }
            Applied::Renamed {
                id,
                title,
                time_slot,
            } => {
                let (start_time, end_time) = anchor(time_slot);
                Some(RemoteCall::Rename(UpdateTaskRequest {
                    id: id.remote_id()?,
                    title: title.clone(),
                    start_time,
                    end_time,
                }))
            }
            Applied::Removed { id } => Some(RemoteCall::Delete(id.remote_id()?)),
        }
    }
}

#[derive(Debug, Clone)]
enum RemoteCall {
    Create { title: String },
    ChangeStatus(ChangeStatusRequest),
    Rename(UpdateTaskRequest),
    Delete(i64),
}

impl RemoteCall {
    async fn send(self, gateway: &dyn TaskGateway) -> SyncResult<()> {
        match self {
            RemoteCall::Create { title } => gateway.create(&title).await.map(|_| ()),
            RemoteCall::ChangeStatus(request) => gateway.change_status(request).await,
            RemoteCall::Rename(request) => gateway.rename(request).await,
            RemoteCall::Delete(id) => gateway.delete(id).await,
        }
    }
}

fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A placeholder token unique within `items`: the current epoch millis,
/// bumped past any placeholder already in the list.
fn next_pending_token(items: &[TaskItem], now: DateTime<Utc>) -> u64 {
    let floor = now.timestamp_millis().max(1) as u64;
    items
        .iter()
        .filter_map(|item| match item.id {
            TaskId::Pending(token) => Some(token),
            TaskId::Confirmed(_) => None,
        })
        .max()
        .map_or(floor, |max| floor.max(max + 1))
}

fn position(items: &[TaskItem], id: TaskId) -> Result<usize, Rejection> {
    items
        .iter()
        .position(|item| item.id == id)
        .ok_or(Rejection::UnknownTask(id))
}

fn apply_intent(
    items: &mut Vec<TaskItem>,
    intent: Intent,
    now: DateTime<Utc>,
) -> Result<Applied, Rejection> {
    match intent {
        Intent::Add { title } => {
            let item = TaskItem::new(TaskId::Pending(next_pending_token(items, now)), title);
            items.insert(0, item.clone());
            Ok(Applied::Added(item))
        }
        Intent::Toggle { id, time_slot } => {
            let idx = position(items, id)?;
            let item = &mut items[idx];
            item.set_done(!item.done, now);
            if time_slot.is_some() {
                item.time_slot = time_slot;
            }
            Ok(Applied::Toggled {
                id,
                done: item.done,
                time_slot: item.time_slot,
            })
        }
        Intent::Rename { id, title } => {
            let idx = position(items, id)?;
            let item = &mut items[idx];
            item.title = title.clone();
            Ok(Applied::Renamed {
                id,
                title,
                time_slot: item.time_slot,
            })
        }
        Intent::Remove { id } => {
            let idx = position(items, id)?;
            items.remove(idx);
            Ok(Applied::Removed { id })
        }
    }
}

pub struct TodoEngine {
    engine_id: Uuid,
    backend: TaskBackend,
    cache: LocalCacheStore,
    clock: Arc<dyn Clock>,
    state: Mutex<SelectionContext>,
    event_dispatcher: Arc<EventDispatcher>,
}

impl TodoEngine {
    pub fn new(backend: TaskBackend, cache: LocalCacheStore, clock: Arc<dyn Clock>) -> Self {
        let state = SelectionContext::new(clock.today());
        Self {
            engine_id: Uuid::new_v4(),
            backend,
            cache,
            clock,
            state: Mutex::new(state),
            event_dispatcher: Arc::new(EventDispatcher::new()),
        }
    }

    /// Opens the cache database and picks the backend from `config`.
    pub async fn from_config(config: &ClientConfig) -> SyncResult<Self> {
        let db = Arc::new(ClientDatabase::open(&config.database_url).await?);
        let backend = TaskBackend::from_config(config)?;
        tracing::info!(
            "Starting to-do engine in {} mode (cache: {})",
            backend.mode(),
            config.database_url
        );
        Ok(Self::new(
            backend,
            LocalCacheStore::new(db),
            Arc::new(SystemClock),
        ))
    }

    pub fn event_dispatcher(&self) -> Arc<EventDispatcher> {
        self.event_dispatcher.clone()
    }

    pub async fn todos(&self) -> Vec<TaskItem> {
        self.state.lock().await.visible().to_vec()
    }

    pub async fn selected_date(&self) -> DateKey {
        self.state.lock().await.selected_date()
    }

    pub async fn session(&self) -> Option<UserSession> {
        self.state.lock().await.session().cloned()
    }

    /// Installs `session`, loads its cached lists and the selected date.
    pub async fn sign_in(&self, session: UserSession) {
        tracing::info!(
            "TODOS {}: signing in {} ({})",
            self.engine_id,
            session.user_id,
            session.role
        );
        let todos = self.cache.read(Some(&session)).await.unwrap_or_default();
        self.state.lock().await.sign_in(session, todos);
        self.refresh().await;
    }

    /// Forgets the session and everything shown. Persisted lists stay.
    pub async fn sign_out(&self) {
        tracing::info!("TODOS {}: signed out, view reset", self.engine_id);
        self.state.lock().await.reset(self.clock.today());
    }

    /// Deletes the signed-in user's persisted lists and empties the view.
    /// The session stays installed.
    pub async fn forget_cached(&self) {
        let (date, session) = {
            let mut state = self.state.lock().await;
            state.clear_lists();
            (state.selected_date(), state.session().cloned())
        };
        tracing::info!("TODOS {}: forgetting cached lists", self.engine_id);
        self.cache.clear(session.as_ref()).await;
        self.event_dispatcher.emit_list_replaced(date, 0);
    }

    pub async fn select_date(&self, date: DateKey) {
        tracing::info!("TODOS {}: selecting {}", self.engine_id, date);
        match &self.backend {
            TaskBackend::Local => self.show_local(date).await,
            TaskBackend::Remote(gateway) => {
                self.state.lock().await.select(date);
                if date == self.clock.today() {
                    self.load_remote(gateway.as_ref(), date).await;
                }
            }
        }
    }

    /// Reloads the selected date from its source of truth.
    pub async fn refresh(&self) {
        let date = self.selected_date().await;
        match &self.backend {
            TaskBackend::Local => self.show_local(date).await,
            TaskBackend::Remote(gateway) => self.load_remote(gateway.as_ref(), date).await,
        }
    }

    pub async fn add(&self, title: &str) -> MutationOutcome {
        match normalize_title(title) {
            Some(title) => self.mutate(Intent::Add { title }).await,
            None => MutationOutcome::Rejected(Rejection::EmptyTitle),
        }
    }

    /// Flips `done`; `time_slot`, when given, replaces the item's slot.
    pub async fn toggle(&self, id: TaskId, time_slot: Option<TimeSlot>) -> MutationOutcome {
        self.mutate(Intent::Toggle { id, time_slot }).await
    }

    pub async fn rename(&self, id: TaskId, title: &str) -> MutationOutcome {
        match normalize_title(title) {
            Some(title) => self.mutate(Intent::Rename { id, title }).await,
            None => MutationOutcome::Rejected(Rejection::EmptyTitle),
        }
    }

    pub async fn remove(&self, id: TaskId) -> MutationOutcome {
        self.mutate(Intent::Remove { id }).await
    }

    async fn mutate(&self, intent: Intent) -> MutationOutcome {
        let outcome = match &self.backend {
            TaskBackend::Local => self.mutate_local(intent).await,
            TaskBackend::Remote(gateway) => self.mutate_remote(gateway.as_ref(), intent).await,
        };
        tracing::debug!("TODOS {}: mutation settled as {:?}", self.engine_id, outcome);
        outcome
    }

    async fn show_local(&self, date: DateKey) {
        let (generation, session) = {
            let state = self.state.lock().await;
            (state.generation(), state.session().cloned())
        };
        let stored = self.cache.read(session.as_ref()).await;

        let mut state = self.state.lock().await;
        if state.generation() != generation {
            tracing::debug!(
                "TODOS {}: session changed while loading {}, dropping it",
                self.engine_id,
                date
            );
            return;
        }
        let todos = stored.unwrap_or_else(|| state.todos_by_date().clone());
        state.show_cached(date, todos);
        let count = state.visible().len();
        drop(state);

        self.event_dispatcher.emit_list_replaced(date, count);
    }

    async fn mutate_local(&self, intent: Intent) -> MutationOutcome {
        let now = self.clock.now().with_timezone(&Utc);

        let (date, session, snapshot, applied) = {
            let mut state = self.state.lock().await;
            let date = state.selected_date();
            let mut items = state.todos_by_date().items(&date);
            let applied = match apply_intent(&mut items, intent, now) {
                Ok(applied) => applied,
                Err(rejection) => return MutationOutcome::Rejected(rejection),
            };
            state.store_date(date, items);
            (
                date,
                state.session().cloned(),
                state.todos_by_date().clone(),
                applied,
            )
        };

        self.cache.write(session.as_ref(), &snapshot).await;
        self.emit_applied(date, &applied);
        MutationOutcome::Committed(Commit::Local)
    }

    async fn mutate_remote(&self, gateway: &dyn TaskGateway, intent: Intent) -> MutationOutcome {
        let now = self.clock.now().with_timezone(&Utc);
        let today = self.clock.today();

        // Days other than today are never listed remotely, so their visible
        // list may still need seeding from the cache.
        let (selected, seen_generation, session) = {
            let state = self.state.lock().await;
            (
                state.selected_date(),
                state.generation(),
                state.session().cloned(),
            )
        };
        let seed = if selected != today {
            Some(self.cache.read_date(session.as_ref(), &selected).await)
        } else {
            None
        };

        // Optimistic write, before any network round-trip.
        let (date, generation, session, optimistic, applied) = {
            let mut state = self.state.lock().await;
            let date = state.selected_date();
            let generation = state.generation();
            let session = state.session().cloned();

            if let Some(seed) = seed {
                if state.is_current(seen_generation, &selected) && state.visible().is_empty() {
                    state.set_visible(seed);
                }
            }

            let mut items = state.visible().to_vec();
            let applied = match apply_intent(&mut items, intent, now) {
                Ok(applied) => applied,
                Err(rejection) => return MutationOutcome::Rejected(rejection),
            };
            state.set_visible(items.clone());
            (date, generation, session, items, applied)
        };
        self.emit_applied(date, &applied);

        if date != today {
            tracing::info!(
                "TODOS {}: {} is not today, keeping change local",
                self.engine_id,
                date
            );
            return self
                .store_locally(
                    date,
                    generation,
                    session,
                    optimistic,
                    applied.advisory(),
                    Commit::Unsynced,
                )
                .await;
        }

        let Some(call) = applied.remote_call(&date) else {
            tracing::info!(
                "TODOS {}: item has no server id, keeping change local",
                self.engine_id
            );
            return self
                .store_locally(
                    date,
                    generation,
                    session,
                    optimistic,
                    applied.advisory(),
                    Commit::Unsynced,
                )
                .await;
        };

        tracing::info!("TODOS {}: sending {:?}", self.engine_id, call);
        if let Err(e) = call.send(gateway).await {
            tracing::warn!(
                "TODOS {}: remote write failed, falling back to cache: {}",
                self.engine_id,
                e
            );
            return self
                .store_locally(
                    date,
                    generation,
                    session,
                    optimistic,
                    applied.advisory(),
                    Commit::CacheFallback,
                )
                .await;
        }

        let refreshed = self
            .fetch_authoritative(gateway, &date, session.as_ref())
            .await;
        match refreshed {
            Ok(items) => {
                self.replace_visible(date, generation, items).await;
                MutationOutcome::Committed(Commit::Authoritative)
            }
            Err(e) => {
                tracing::warn!(
                    "TODOS {}: re-fetch after write failed, falling back to cache: {}",
                    self.engine_id,
                    e
                );
                self.store_locally(
                    date,
                    generation,
                    session,
                    optimistic,
                    applied.advisory(),
                    Commit::CacheFallback,
                )
                .await
            }
        }
    }

    /// Persists the current list for `date` to `session`'s cache. If the
    /// session or the selected date has changed since `generation`, the list
    /// captured at optimistic time is written instead.
    async fn store_locally(
        &self,
        date: DateKey,
        generation: u64,
        session: Option<UserSession>,
        optimistic: Vec<TaskItem>,
        advisory: Advisory,
        commit: Commit,
    ) -> MutationOutcome {
        let items = {
            let state = self.state.lock().await;
            if state.is_current(generation, &date) {
                state.visible().to_vec()
            } else {
                optimistic
            }
        };

        self.cache.write_date(session.as_ref(), date, items).await;
        self.event_dispatcher.emit_stored_locally(date, advisory);
        MutationOutcome::Committed(commit)
    }

    /// list-today, mapped, with the cached entry standing in for an empty
    /// response.
    async fn fetch_authoritative(
        &self,
        gateway: &dyn TaskGateway,
        date: &DateKey,
        session: Option<&UserSession>,
    ) -> SyncResult<Vec<TaskItem>> {
        let records = gateway.list_today().await?;
        let mapped = map_remote_records(&records);
        tracing::info!(
            "TODOS {}: list-today returned {} item(s)",
            self.engine_id,
            mapped.len()
        );

        if mapped.is_empty() {
            let cached = self.cache.read_date(session, date).await;
            if !cached.is_empty() {
                tracing::info!(
                    "TODOS {}: empty response, showing {} cached item(s) for {}",
                    self.engine_id,
                    cached.len(),
                    date
                );
            }
            return Ok(prefer_cached(mapped, &cached));
        }
        Ok(mapped)
    }

    async fn load_remote(&self, gateway: &dyn TaskGateway, date: DateKey) {
        let (generation, session) = {
            let state = self.state.lock().await;
            (state.generation(), state.session().cloned())
        };

        if date != self.clock.today() {
            self.replace_visible(date, generation, Vec::new()).await;
            return;
        }

        let items = match self.fetch_authoritative(gateway, &date, session.as_ref()).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    "TODOS {}: list-today failed, showing cached entry: {}",
                    self.engine_id,
                    e
                );
                self.cache.read_date(session.as_ref(), &date).await
            }
        };
        self.replace_visible(date, generation, items).await;
    }

    /// Replaces the visible list, unless the session or the selected date
    /// has changed since `generation` was taken.
    async fn replace_visible(&self, date: DateKey, generation: u64, items: Vec<TaskItem>) {
        let count = items.len();
        {
            let mut state = self.state.lock().await;
            if !state.is_current(generation, &date) {
                tracing::debug!(
                    "TODOS {}: dropping result for {}, no longer current",
                    self.engine_id,
                    date
                );
                return;
            }
            state.set_visible(items);
        }
        self.event_dispatcher.emit_list_replaced(date, count);
    }

    fn emit_applied(&self, date: DateKey, applied: &Applied) {
        match applied {
            Applied::Added(item) => self
                .event_dispatcher
                .emit_task_added(date, item.id, &item.title),
            Applied::Toggled { id, .. } | Applied::Renamed { id, .. } => {
                self.event_dispatcher.emit_task_updated(date, *id)
            }
            Applied::Removed { id } => self.event_dispatcher.emit_task_removed(date, *id),
        }
    }
}
