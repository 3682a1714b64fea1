#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kanban_core::model::{Board, BoardId, Column, ColumnId, Task, TaskId, WorkspaceId};
use proptest::prelude::*;

pub fn ts() -> DateTime<Utc> {
    DateTime::from_timestamp(1_708_012_200, 0).unwrap_or_default()
}

pub fn task(id: &str, column: &str, position: usize) -> Arc<Task> {
    Arc::new(Task {
        id: TaskId::new(id),
        title: format!("Task {id}"),
        description: None,
        column_id: ColumnId::new(column),
        position,
        created_at: ts(),
        updated_at: ts(),
    })
}

/// Build a dense board from per-column task counts. Columns are `c0..cN`,
/// tasks are `t0..tM` numbered across the whole board.
pub fn board_with(counts: &[usize]) -> Board {
    let mut next_task = 0;
    let columns = counts
        .iter()
        .enumerate()
        .map(|(ci, &count)| {
            let column_id = format!("c{ci}");
            let tasks = (0..count)
                .map(|pos| {
                    let t = task(&format!("t{next_task}"), &column_id, pos);
                    next_task += 1;
                    t
                })
                .collect();
            Arc::new(Column {
                id: ColumnId::new(column_id),
                name: format!("Column {ci}"),
                position: ci,
                board_id: BoardId::new("b1"),
                tasks,
            })
        })
        .collect();

    Board {
        id: BoardId::new("b1"),
        name: "Board".into(),
        workspace_id: WorkspaceId::new("ws"),
        columns,
    }
}

/// The todo / in-progress / done board used by the scenario tests.
pub fn sample_board() -> Board {
    let mut board = board_with(&[3, 1, 0]);
    let names = ["Todo", "In Progress", "Done"];
    for (column, name) in board.columns.iter_mut().zip(names) {
        Arc::make_mut(column).name = name.to_string();
    }
    board
}

pub fn arb_counts() -> impl Strategy<Value = Vec<usize>> + Clone {
    prop::collection::vec(0usize..6, 1..5)
}

/// A move request as `(task index, column index, position)`. Indexes may be
/// out of range; the caller reduces them modulo the board's sizes or uses
/// them raw to exercise the no-op paths.
pub fn arb_move() -> impl Strategy<Value = (usize, usize, usize)> + Clone {
    (0usize..32, 0usize..6, 0usize..10)
}

/// One step of a random board history. Indexes are raw like [`arb_move`].
#[derive(Debug, Clone)]
pub enum BoardOp {
    Move(usize, usize, usize),
    /// A server-created task for column `.0`, reporting position `.1`.
    Create(usize, usize),
    Delete(usize),
    /// A server copy of the task with new content and a stale placement.
    Edit(usize),
}

pub fn arb_op() -> impl Strategy<Value = BoardOp> {
    prop_oneof![
        3 => arb_move().prop_map(|(t, c, p)| BoardOp::Move(t, c, p)),
        1 => (0usize..6, 0usize..10).prop_map(|(c, p)| BoardOp::Create(c, p)),
        1 => (0usize..40).prop_map(BoardOp::Delete),
        1 => (0usize..40).prop_map(BoardOp::Edit),
    ]
}
