//! kanban-core library.
//!
//! Offline-first board state: moves apply locally first, persist to a
//! workspace-scoped cache, and reach the remote store through a coalescing
//! queue flushed on a timer.
//!
//! Entry point is [`session::KanbanSession`].
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per concern, each mapped to an
//!   [`error::ErrorCode`]. Config loading uses `anyhow::Result`.
//! - **Logging**: `tracing` macros with structured fields.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod notify;
pub mod queue;
pub mod reducer;
pub mod remote;
pub mod session;
pub mod sync;
