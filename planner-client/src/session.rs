//! Which date is selected, who is signed in, and what is currently shown.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};
use planner_core::{DateKey, TaskItem, TodosByDate, UserSession};
use std::sync::Mutex;

/// Source of "now" on the local calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> DateKey {
        DateKey::from_local(&self.now())
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock pinned to a given local date and time, movable by tests.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Noon on `date`.
    pub fn on(date: DateKey) -> Self {
        Self {
            now: Mutex::new(date.date().and_time(noon())),
        }
    }

    pub fn set_date(&self, date: DateKey) {
        if let Ok(mut now) = self.now.lock() {
            *now = date.date().and_time(noon());
        }
    }

    fn naive_now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        Local
            .from_local_datetime(&self.naive_now())
            .earliest()
            .unwrap_or_else(Local::now)
    }

    fn today(&self) -> DateKey {
        DateKey::new(self.naive_now().date())
    }
}

/// The engine's view state. One instance per engine; never shared across
/// users, and wiped on sign-out.
///
/// `generation` changes on every sign-in and reset. Work that suspends
/// captures it first and must not touch the view once it has moved on.
#[derive(Debug, Clone)]
pub struct SelectionContext {
    selected_date: DateKey,
    session: Option<UserSession>,
    todos_by_date: TodosByDate,
    visible: Vec<TaskItem>,
    generation: u64,
}

impl SelectionContext {
    pub fn new(today: DateKey) -> Self {
        Self {
            selected_date: today,
            session: None,
            todos_by_date: TodosByDate::new(),
            visible: Vec::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the same session is installed and `date` is still shown.
    pub fn is_current(&self, generation: u64, date: &DateKey) -> bool {
        self.generation == generation && self.is_selected(date)
    }

    pub fn selected_date(&self) -> DateKey {
        self.selected_date
    }

    pub fn is_selected(&self, date: &DateKey) -> bool {
        self.selected_date == *date
    }

    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    pub fn visible(&self) -> &[TaskItem] {
        &self.visible
    }

    pub fn set_visible(&mut self, items: Vec<TaskItem>) {
        self.visible = items;
    }

    pub fn todos_by_date(&self) -> &TodosByDate {
        &self.todos_by_date
    }

    /// Switches date and clears the list until something authoritative
    /// (or cached) arrives.
    pub fn select(&mut self, date: DateKey) {
        self.selected_date = date;
        self.visible.clear();
    }

    /// Switches date and shows `todos`' entry for it straight away.
    pub fn show_cached(&mut self, date: DateKey, todos: TodosByDate) {
        self.visible = todos.items(&date);
        self.todos_by_date = todos;
        self.selected_date = date;
    }

    /// Replaces one date's entry in the local map, mirroring it to the
    /// visible list when that date is selected.
    pub fn store_date(&mut self, date: DateKey, items: Vec<TaskItem>) {
        if self.is_selected(&date) {
            self.visible = items.clone();
        }
        self.todos_by_date.set(date, items);
    }

    pub fn sign_in(&mut self, session: UserSession, todos: TodosByDate) {
        self.session = Some(session);
        self.visible = todos.items(&self.selected_date);
        self.todos_by_date = todos;
        self.generation += 1;
    }

    pub fn reset(&mut self, today: DateKey) {
        let generation = self.generation + 1;
        *self = Self::new(today);
        self.generation = generation;
    }

    /// Drops every list held in memory, keeping the session and date.
    pub fn clear_lists(&mut self) {
        self.todos_by_date = TodosByDate::new();
        self.visible.clear();
    }
}
