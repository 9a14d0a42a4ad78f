use planner_core::SyncResult;
use std::sync::Arc;

use crate::config::{ClientConfig, SyncMode};
use crate::gateway::{HttpTaskGateway, TaskGateway};

/// Where the engine reconciles mutations, chosen once at construction.
#[derive(Clone)]
pub enum TaskBackend {
    /// The cache is the source of truth.
    Local,
    /// The gateway owns today's list; the cache catches failures.
    Remote(Arc<dyn TaskGateway>),
}

impl TaskBackend {
    pub fn remote(gateway: Arc<dyn TaskGateway>) -> Self {
        TaskBackend::Remote(gateway)
    }

    pub fn from_config(config: &ClientConfig) -> SyncResult<Self> {
        match config.mode {
            SyncMode::Local => Ok(TaskBackend::Local),
            SyncMode::Server => Ok(TaskBackend::Remote(Arc::new(
                HttpTaskGateway::from_config(config)?,
            ))),
        }
    }

    pub fn mode(&self) -> SyncMode {
        match self {
            TaskBackend::Local => SyncMode::Local,
            TaskBackend::Remote(_) => SyncMode::Server,
        }
    }
}

impl std::fmt::Debug for TaskBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskBackend::{}", self.mode())
    }
}
