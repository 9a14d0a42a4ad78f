use planner_core::{DateKey, TaskId};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    TaskAdded,
    TaskUpdated,
    TaskRemoved,
    ListReplaced,
    StoredLocally,
}

/// Soft warning shown when a change could only be kept on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    SaveFailed,
    ApplyFailed,
    DeleteFailed,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Advisory::SaveFailed => "Could not save to the server. Stored locally for now.",
            Advisory::ApplyFailed => "Could not update the server. The change is stored locally.",
            Advisory::DeleteFailed => "Could not delete on the server. Removed locally.",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TodoEvent {
    TaskAdded {
        date: DateKey,
        task_id: TaskId,
        title: String,
    },
    TaskUpdated {
        date: DateKey,
        task_id: TaskId,
    },
    TaskRemoved {
        date: DateKey,
        task_id: TaskId,
    },
    ListReplaced {
        date: DateKey,
        count: usize,
    },
    StoredLocally {
        date: DateKey,
        advisory: Advisory,
    },
}

impl TodoEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            TodoEvent::TaskAdded { .. } => EventType::TaskAdded,
            TodoEvent::TaskUpdated { .. } => EventType::TaskUpdated,
            TodoEvent::TaskRemoved { .. } => EventType::TaskRemoved,
            TodoEvent::ListReplaced { .. } => EventType::ListReplaced,
            TodoEvent::StoredLocally { .. } => EventType::StoredLocally,
        }
    }
}

pub type EventCallback = Box<dyn Fn(&TodoEvent) + Send + Sync>;

struct CallbackEntry {
    callback: EventCallback,
    event_filter: Option<EventType>,
}

pub struct EventDispatcher {
    callbacks: Mutex<Vec<CallbackEntry>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Registers `callback` for every event, or only for `event_filter`.
    /// Callbacks run synchronously on the emitting task and must not
    /// register further callbacks.
    pub fn register_callback<F>(
        &self,
        callback: F,
        event_filter: Option<EventType>,
    ) -> Result<(), &'static str>
    where
        F: Fn(&TodoEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .lock()
            .map_err(|_| "Failed to acquire callback lock")?;

        callbacks.push(CallbackEntry {
            callback: Box::new(callback),
            event_filter,
        });

        Ok(())
    }

    pub fn emit_task_added(&self, date: DateKey, task_id: TaskId, title: &str) {
        self.emit(TodoEvent::TaskAdded {
            date,
            task_id,
            title: title.to_string(),
        });
    }

    pub fn emit_task_updated(&self, date: DateKey, task_id: TaskId) {
        self.emit(TodoEvent::TaskUpdated { date, task_id });
    }

    pub fn emit_task_removed(&self, date: DateKey, task_id: TaskId) {
        self.emit(TodoEvent::TaskRemoved { date, task_id });
    }

    pub fn emit_list_replaced(&self, date: DateKey, count: usize) {
        self.emit(TodoEvent::ListReplaced { date, count });
    }

    pub fn emit_stored_locally(&self, date: DateKey, advisory: Advisory) {
        tracing::warn!("{} ({})", advisory, date);
        self.emit(TodoEvent::StoredLocally { date, advisory });
    }

    fn emit(&self, event: TodoEvent) {
        let callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(_) => {
                tracing::error!("Failed to acquire callback lock for event emission");
                return;
            }
        };

        let event_type = event.event_type();
        for entry in callbacks.iter() {
            if let Some(filter) = entry.event_filter {
                if filter != event_type {
                    continue;
                }
            }

            (entry.callback)(&event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
