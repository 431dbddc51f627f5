//! # Routinely Core Library
//!
//! This library provides the core logic for Routinely, a routine and habit
//! runner. It picks the routine that fits "now" and drives a run of it,
//! habit by habit. Everything is available through the `routinely` CLI;
//! any graphical or companion client is a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Context**: classifies an instant and an optional coordinate into a
//!   time slot, a day category and a saved location
//! - **Selector**: scores templates against a context, with fallbacks
//! - **Session**: a cursor over a template snapshot plus an append-only
//!   modification log, with conditional branching
//! - **Storage**: SQLite for templates and history, TOML for configuration
//! - **Companion / Export**: serialized views for the wrist device and
//!   for backups
//!
//! ## Key Components
//!
//! - [`ContextClassifier`]: turns "now" into a [`RoutineContext`]
//! - [`RoutineSelector`]: picks a [`RoutineTemplate`] for a context
//! - [`SessionController`]: owns the running [`RoutineSession`]
//! - [`Database`] / [`Config`]: persistence

pub mod companion;
pub mod context;
pub mod error;
pub mod events;
pub mod export;
pub mod habit;
pub mod reporting;
pub mod selector;
pub mod session;
pub mod storage;
pub mod template;

pub use companion::{
    apply_companion_message, templates_for_companion, CompanionError, CompanionMessage,
};
pub use context::{
    ContextClassifier, ContextSettings, Coordinate, DayCategory, LocationKind, LocationMonitor,
    RoutineContext, SavedLocation, TimeRange, TimeSlot,
};
pub use error::{
    ConfigError, CoreError, DatabaseError, LocationError, RoutineStateError, ValidationError,
};
pub use events::Event;
pub use export::{ExportBundle, ExportError, ImportSummary};
pub use habit::{
    ConditionalHabitInfo, ConditionalOption, ConditionalResponse, Habit, HabitType, Interaction,
};
pub use reporting::{ErrorReport, ErrorReporter, TracingReporter};
pub use selector::{RoutineSelector, Selection, SelectionSource};
pub use session::{HabitCompletion, RoutineSession, SessionController, SessionSummary};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use template::{ContextRule, RoutineTemplate};
