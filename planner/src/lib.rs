//! Planner - date-scoped to-do lists for mentees
//!
//! This crate provides a unified API for the planner engine.
//!
//! # Example
//!
//! ```ignore
//! use planner::{ClientConfig, TodoEngine, UserSession};
//!
//! let engine = TodoEngine::from_config(&ClientConfig::from_env()?).await?;
//! engine.sign_in(UserSession::mentee("student-1")).await;
//! engine.add("Math review").await;
//! ```

// Re-export engine types
pub use planner_client::{
    Advisory, ClientConfig, Commit, EventType, MutationOutcome, Rejection, SyncMode, TodoEngine,
    TodoEvent,
};

// Re-export the seams an embedding application may swap out
pub use planner_client::{Clock, HttpTaskGateway, KeyValueStore, TaskBackend, TaskGateway};

// Re-export core types that external applications may need
pub use planner_core::errors::SyncError;
pub use planner_core::models::{TaskId, TaskItem, TimeSlot, UserSession};
pub use planner_core::DateKey;
pub use planner_core::SyncResult;
