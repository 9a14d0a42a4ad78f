use async_trait::async_trait;
use planner_client::{
    ClientDatabase, Clock, FixedClock, LocalCacheStore, TaskBackend, TaskGateway, TodoEngine,
    TodoEvent,
};
use planner_core::{
    ChangeStatusRequest, DateKey, RemoteTaskRecord, SyncError, SyncResult, TaskStatus,
    UpdateTaskRequest,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Creates a new in-memory test sqlite database and runs migrations.
#[allow(dead_code)]
pub async fn setup_test_db() -> Arc<ClientDatabase> {
    Arc::new(ClientDatabase::open("sqlite::memory:").await.unwrap())
}

#[allow(dead_code)]
pub fn date(s: &str) -> DateKey {
    s.parse().unwrap()
}

/// A clock-pinned engine working against the cache only.
#[allow(dead_code)]
pub fn local_engine(db: Arc<ClientDatabase>, today: &str) -> (TodoEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::on(date(today)));
    let engine = TodoEngine::new(
        TaskBackend::Local,
        LocalCacheStore::new(db),
        clock.clone() as Arc<dyn Clock>,
    );
    (engine, clock)
}

/// A clock-pinned engine reconciling against `gateway`.
#[allow(dead_code)]
pub fn remote_engine(db: Arc<ClientDatabase>, gateway: Arc<MockGateway>, today: &str) -> TodoEngine {
    TodoEngine::new(
        TaskBackend::remote(gateway),
        LocalCacheStore::new(db),
        Arc::new(FixedClock::on(date(today))),
    )
}

/// Collects every event the engine emits.
#[allow(dead_code)]
pub fn record_events(engine: &TodoEngine) -> Arc<Mutex<Vec<TodoEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    engine
        .event_dispatcher()
        .register_callback(
            move |event| events_clone.lock().unwrap().push(event.clone()),
            None,
        )
        .unwrap();
    events
}

#[allow(dead_code)]
pub fn record(id: i64, title: &str) -> RemoteTaskRecord {
    RemoteTaskRecord {
        id: Some(id),
        title: Some(title.to_string()),
        status: Some(TaskStatus::NotCompleted.to_string()),
        start_time: None,
        end_time: None,
    }
}

/// Scripted in-process stand-in for the REST backend.
#[derive(Default)]
pub struct MockGateway {
    records: Mutex<Vec<RemoteTaskRecord>>,
    next_id: AtomicI64,
    offline: AtomicBool,
    listing_fails: AtomicBool,
    calls: Mutex<Vec<String>>,
    // request bodies are kept even when the call then fails
    status_requests: Mutex<Vec<ChangeStatusRequest>>,
    rename_requests: Mutex<Vec<UpdateTaskRequest>>,
    list_hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        })
    }

    pub fn with_records(records: Vec<RemoteTaskRecord>) -> Arc<Self> {
        let next = records.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        let gateway = Self::new();
        gateway.next_id.store(next, Ordering::SeqCst);
        *gateway.records.lock().unwrap() = records;
        gateway
    }

    /// Every call fails as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Only list-today fails; writes still go through.
    pub fn set_listing_fails(&self, fails: bool) {
        self.listing_fails.store(fails, Ordering::SeqCst);
    }

    /// Makes the next list-today signal `entered` and then wait for
    /// `release`. Returns `(entered, release)`.
    pub fn hold_next_list(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.list_hold.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    pub fn records(&self) -> Vec<RemoteTaskRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn status_requests(&self) -> Vec<ChangeStatusRequest> {
        self.status_requests.lock().unwrap().clone()
    }

    pub fn rename_requests(&self) -> Vec<UpdateTaskRequest> {
        self.rename_requests.lock().unwrap().clone()
    }

    fn enter(&self, name: &str) -> SyncResult<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn with_record<F>(&self, id: i64, f: F) -> SyncResult<()>
    where
        F: FnOnce(&mut RemoteTaskRecord),
    {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == Some(id)) {
            Some(record) => {
                f(record);
                Ok(())
            }
            None => Err(SyncError::RemoteRejected {
                code: "TODO404".to_string(),
                message: format!("no todo {id}"),
            }),
        }
    }
}

#[async_trait]
impl TaskGateway for MockGateway {
    async fn list_today(&self) -> SyncResult<Vec<RemoteTaskRecord>> {
        self.enter("list_today")?;

        let hold = self.list_hold.lock().unwrap().take();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }

        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(SyncError::Network("timed out".to_string()));
        }
        Ok(self.records())
    }

    async fn create(&self, title: &str) -> SyncResult<RemoteTaskRecord> {
        self.enter("create")?;
        let record = record(self.next_id.fetch_add(1, Ordering::SeqCst), title);
        self.records.lock().unwrap().insert(0, record.clone());
        Ok(record)
    }

    async fn change_status(&self, request: ChangeStatusRequest) -> SyncResult<()> {
        self.status_requests.lock().unwrap().push(request.clone());
        self.enter("change_status")?;
        self.with_record(request.id, |record| {
            record.status = Some(request.status.to_string());
            if request.start_time.is_some() {
                record.start_time = request.start_time.clone();
                record.end_time = request.end_time.clone();
            }
        })
    }

    async fn rename(&self, request: UpdateTaskRequest) -> SyncResult<()> {
        self.rename_requests.lock().unwrap().push(request.clone());
        self.enter("rename")?;
        self.with_record(request.id, |record| {
            record.title = Some(request.title.clone());
        })
    }

    async fn delete(&self, id: i64) -> SyncResult<()> {
        self.enter("delete")?;
        let mut records = self.records.lock().unwrap();
        records.retain(|r| r.id != Some(id));
        Ok(())
    }
}
