//! Data model: boards, columns, tasks, queued placements and request bodies.

pub mod board;
pub mod ids;
pub mod pending;
pub mod requests;

pub use board::{Board, Column, Task};
pub use ids::{BoardId, ColumnId, TaskId, WorkspaceId};
pub use pending::PendingUpdate;
pub use requests::{NewColumn, NewTask, TaskPatch};
