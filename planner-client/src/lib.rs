pub mod backend;
pub mod cache;
pub mod config;
pub mod database;
pub mod engine;
pub mod events;
pub mod gateway;
pub mod queries;
pub mod session;

pub use backend::TaskBackend;
pub use cache::LocalCacheStore;
pub use config::{ClientConfig, SyncMode};
pub use database::{ClientDatabase, KeyValueStore};
pub use engine::{Commit, MutationOutcome, Rejection, TodoEngine};
pub use events::{Advisory, EventDispatcher, EventType, TodoEvent};
pub use gateway::{HttpTaskGateway, TaskGateway};
pub use session::{Clock, FixedClock, SelectionContext, SystemClock};
