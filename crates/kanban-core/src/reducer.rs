//! Optimistic board reducer.
//!
//! Every function here takes the current snapshot by reference and returns a
//! brand-new `Arc<Board>`; the input is never modified. Functions return
//! `None` when the operation references something that doesn't exist on the
//! board, and callers treat that as a silent no-op.
//!
//! After any successful reduction, each touched column is renumbered so task
//! positions are dense (`0..n`) in list order.

use std::sync::Arc;

use crate::model::{Board, Column, ColumnId, Task, TaskId};

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Result of a successful [`move_task`].
#[derive(Debug, Clone)]
pub struct Move {
    /// The new snapshot.
    pub board: Arc<Board>,
    /// The moved task as it sits in the new snapshot (post-move column and
    /// position).
    pub task: Arc<Task>,
}

/// Move a task to `target_position` in `target_column`.
///
/// # Algorithm
///
/// 1. Locate the task record and the target column. Either missing → `None`.
/// 2. Remove the task from its source column.
/// 3. Insert it into the target column at `min(target_position, len)`, so an
///    out-of-range index appends.
/// 4. Renumber the source and target columns densely.
///
/// Only the source and target columns are copied; every other column in the
/// returned board is pointer-equal to the input's.
#[must_use]
pub fn move_task(
    board: &Arc<Board>,
    task_id: &TaskId,
    target_column: &ColumnId,
    target_position: usize,
) -> Option<Move> {
    let (src_col, src_idx) = board.locate_task(task_id)?;
    let dst_col = board.column_index(target_column)?;

    let record = Arc::clone(&board.columns[src_col].tasks[src_idx]);
    let mut next = Board::clone(board);

    {
        let source = Arc::make_mut(&mut next.columns[src_col]);
        source.tasks.remove(src_idx);
        renumber(source);
    }

    let target = Arc::make_mut(&mut next.columns[dst_col]);
    let index = target_position.min(target.tasks.len());

    let mut moved = Task::clone(&record);
    moved.column_id = target.id.clone();
    moved.position = index;
    target.tasks.insert(index, Arc::new(moved));
    renumber(target);

    let task = Arc::clone(&target.tasks[index]);
    Some(Move {
        board: Arc::new(next),
        task,
    })
}

// ---------------------------------------------------------------------------
// CRUD merges
// ---------------------------------------------------------------------------

/// Append a server-confirmed task to the end of its column.
///
/// A stale copy with the same id (e.g. a duplicated create response) is
/// dropped first so the board never holds the task twice.
#[must_use]
pub fn insert_task(board: &Arc<Board>, task: Task) -> Option<Arc<Board>> {
    let dst_col = board.column_index(&task.column_id)?;
    let mut next = Board::clone(board);

    if let Some((ci, ti)) = board.locate_task(&task.id) {
        let stale = Arc::make_mut(&mut next.columns[ci]);
        stale.tasks.remove(ti);
        renumber(stale);
    }

    let target = Arc::make_mut(&mut next.columns[dst_col]);
    target.tasks.push(Arc::new(task));
    renumber(target);

    Some(Arc::new(next))
}

/// Remove a task from the board.
#[must_use]
pub fn remove_task(board: &Arc<Board>, task_id: &TaskId) -> Option<Arc<Board>> {
    let (ci, ti) = board.locate_task(task_id)?;
    let mut next = Board::clone(board);

    let column = Arc::make_mut(&mut next.columns[ci]);
    column.tasks.remove(ti);
    renumber(column);

    Some(Arc::new(next))
}

/// Merge the content fields of a server-returned task into the local record.
///
/// Title, description and timestamps come from `canonical`. Column and
/// position stay local: placement is owned by the mutation queue, and the
/// server copy may predate moves that haven't been flushed yet.
#[must_use]
pub fn merge_task(board: &Arc<Board>, canonical: &Task) -> Option<Arc<Board>> {
    let (ci, ti) = board.locate_task(&canonical.id)?;
    let mut next = Board::clone(board);

    let column = Arc::make_mut(&mut next.columns[ci]);
    let local = Arc::make_mut(&mut column.tasks[ti]);
    local.title.clone_from(&canonical.title);
    local.description.clone_from(&canonical.description);
    local.created_at = canonical.created_at;
    local.updated_at = canonical.updated_at;

    Some(Arc::new(next))
}

/// Append a server-confirmed column at the end of the board.
///
/// The column is placed at rank `columns.len()` and starts with no tasks.
#[must_use]
pub fn append_column(board: &Arc<Board>, mut column: Column) -> Arc<Board> {
    let mut next = Board::clone(board);
    column.position = next.columns.len();
    column.tasks.clear();
    next.columns.push(Arc::new(column));
    Arc::new(next)
}

// ---------------------------------------------------------------------------
// Density
// ---------------------------------------------------------------------------

/// A column whose task positions are not exactly `0..n` in list order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column {column_id} has positions {found:?}, expected 0..{len}")]
pub struct DensityViolation {
    pub column_id: ColumnId,
    pub found: Vec<usize>,
    pub len: usize,
}

/// Verify that every column's positions are dense in list order.
///
/// # Errors
///
/// Returns the first column that violates the invariant.
pub fn check_density(board: &Board) -> Result<(), DensityViolation> {
    for column in &board.columns {
        let dense = column
            .tasks
            .iter()
            .enumerate()
            .all(|(i, t)| t.position == i && t.column_id == column.id);
        if !dense {
            return Err(DensityViolation {
                column_id: column.id.clone(),
                found: column.positions(),
                len: column.tasks.len(),
            });
        }
    }
    Ok(())
}

/// Renumber every column of a board that violates density.
///
/// Returns `None` when the board is already dense, so callers can keep the
/// input snapshot.
#[must_use]
pub fn normalize(board: &Arc<Board>) -> Option<Arc<Board>> {
    if check_density(board).is_ok() {
        return None;
    }

    let mut next = Board::clone(board);
    for column in &mut next.columns {
        let dense = column
            .tasks
            .iter()
            .enumerate()
            .all(|(i, t)| t.position == i && t.column_id == column.id);
        if !dense {
            renumber(Arc::make_mut(column));
        }
    }
    Some(Arc::new(next))
}

/// Rewrite positions (and owning column) in list order, copying only the
/// tasks whose values change.
fn renumber(column: &mut Column) {
    let column_id = column.id.clone();
    for (i, task) in column.tasks.iter_mut().enumerate() {
        if task.position != i || task.column_id != column_id {
            let task = Arc::make_mut(task);
            task.position = i;
            task.column_id.clone_from(&column_id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoardId, WorkspaceId};
    use chrono::{DateTime, Utc};

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_708_012_200, 0).expect("valid timestamp")
    }

    fn task(id: &str, column: &str, position: usize) -> Arc<Task> {
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

    fn column(id: &str, position: usize, task_ids: &[&str]) -> Arc<Column> {
        Arc::new(Column {
            id: ColumnId::new(id),
            name: id.to_uppercase(),
            position,
            board_id: BoardId::new("b1"),
            tasks: task_ids
                .iter()
                .enumerate()
                .map(|(i, t)| task(t, id, i))
                .collect(),
        })
    }

    fn board(columns: Vec<Arc<Column>>) -> Arc<Board> {
        Arc::new(Board {
            id: BoardId::new("b1"),
            name: "Main".into(),
            workspace_id: WorkspaceId::new("ws"),
            columns,
        })
    }

    fn ids(board: &Board, column: &str) -> Vec<String> {
        board
            .column(&ColumnId::new(column))
            .expect("column exists")
            .tasks
            .iter()
            .map(|t| t.id.to_string())
            .collect()
    }

    #[test]
    fn cross_column_move() {
        let before = board(vec![column("a", 0, &["t1", "t2"]), column("b", 1, &[])]);
        let mv = move_task(&before, &TaskId::new("t1"), &ColumnId::new("b"), 0)
            .expect("move applies");

        assert_eq!(ids(&mv.board, "a"), ["t2"]);
        assert_eq!(ids(&mv.board, "b"), ["t1"]);
        assert_eq!(mv.board.column(&ColumnId::new("a")).expect("a").positions(), [0]);
        assert_eq!(mv.task.column_id, ColumnId::new("b"));
        assert_eq!(mv.task.position, 0);
        check_density(&mv.board).expect("dense after move");
    }

    #[test]
    fn reorder_within_column() {
        let before = board(vec![column("a", 0, &["t1", "t2", "t3"])]);
        let mv = move_task(&before, &TaskId::new("t3"), &ColumnId::new("a"), 0)
            .expect("move applies");

        assert_eq!(ids(&mv.board, "a"), ["t3", "t1", "t2"]);
        assert_eq!(mv.board.columns[0].positions(), [0, 1, 2]);
    }

    #[test]
    fn index_past_end_appends() {
        let before = board(vec![column("a", 0, &["t1", "t2", "t3"])]);
        let mv = move_task(&before, &TaskId::new("t1"), &ColumnId::new("a"), 99)
            .expect("move applies");

        assert_eq!(ids(&mv.board, "a"), ["t2", "t3", "t1"]);
        assert_eq!(mv.task.position, 2);
    }

    #[test]
    fn unknown_task_or_column_is_noop() {
        let before = board(vec![column("a", 0, &["t1"]), column("b", 1, &[])]);
        assert!(move_task(&before, &TaskId::new("ghost"), &ColumnId::new("b"), 0).is_none());
        assert!(move_task(&before, &TaskId::new("t1"), &ColumnId::new("zz"), 0).is_none());
    }

    #[test]
    fn input_board_is_not_mutated() {
        let before = board(vec![column("a", 0, &["t1", "t2"]), column("b", 1, &[])]);
        let copy = Board::clone(&before);
        let _ = move_task(&before, &TaskId::new("t1"), &ColumnId::new("b"), 0);
        assert_eq!(*before, copy);
    }

    #[test]
    fn untouched_columns_keep_identity() {
        let before = board(vec![
            column("a", 0, &["t1"]),
            column("b", 1, &["t2"]),
            column("c", 2, &["t3"]),
        ]);
        let mv = move_task(&before, &TaskId::new("t1"), &ColumnId::new("b"), 1)
            .expect("move applies");

        assert!(!Arc::ptr_eq(&before, &mv.board));
        assert!(!Arc::ptr_eq(&before.columns[0], &mv.board.columns[0]));
        assert!(!Arc::ptr_eq(&before.columns[1], &mv.board.columns[1]));
        assert!(Arc::ptr_eq(&before.columns[2], &mv.board.columns[2]));
        // t2 kept its position, so its record is shared too.
        assert!(Arc::ptr_eq(&before.columns[1].tasks[0], &mv.board.columns[1].tasks[0]));
    }

    #[test]
    fn insert_appends_and_renumbers() {
        let before = board(vec![column("a", 0, &["t1"])]);
        let mut created = Task::clone(&task("t9", "a", 17));
        created.title = "Fresh".into();
        let after = insert_task(&before, created).expect("column exists");

        assert_eq!(ids(&after, "a"), ["t1", "t9"]);
        assert_eq!(after.columns[0].positions(), [0, 1]);
    }

    #[test]
    fn insert_replaces_stale_copy() {
        let before = board(vec![column("a", 0, &["t1", "t2"]), column("b", 1, &[])]);
        let dup = Task::clone(&task("t1", "b", 0));
        let after = insert_task(&before, dup).expect("column exists");

        assert_eq!(ids(&after, "a"), ["t2"]);
        assert_eq!(ids(&after, "b"), ["t1"]);
        check_density(&after).expect("dense");
    }

    #[test]
    fn insert_into_unknown_column_is_noop() {
        let before = board(vec![column("a", 0, &[])]);
        assert!(insert_task(&before, Task::clone(&task("t1", "zz", 0))).is_none());
    }

    #[test]
    fn remove_renumbers_remaining() {
        let before = board(vec![column("a", 0, &["t1", "t2", "t3"])]);
        let after = remove_task(&before, &TaskId::new("t1")).expect("task exists");

        assert_eq!(ids(&after, "a"), ["t2", "t3"]);
        assert_eq!(after.columns[0].positions(), [0, 1]);
        assert!(remove_task(&after, &TaskId::new("t1")).is_none());
    }

    #[test]
    fn merge_keeps_local_placement() {
        let before = board(vec![column("a", 0, &["t1"]), column("b", 1, &["t2"])]);
        let mut canonical = Task::clone(&task("t2", "a", 5));
        canonical.title = "Renamed".into();
        canonical.description = Some("now with details".into());

        let after = merge_task(&before, &canonical).expect("task exists");
        let merged = after.task(&TaskId::new("t2")).expect("still there");
        assert_eq!(merged.title, "Renamed");
        assert_eq!(merged.description.as_deref(), Some("now with details"));
        assert_eq!(merged.column_id, ColumnId::new("b"));
        assert_eq!(merged.position, 0);
    }

    #[test]
    fn append_column_goes_last_and_empty() {
        let before = board(vec![column("a", 0, &["t1"])]);
        let mut incoming = Column::clone(&column("z", 42, &["x1"]));
        incoming.name = "Review".into();

        let after = append_column(&before, incoming);
        assert_eq!(after.columns.len(), 2);
        assert_eq!(after.columns[1].position, 1);
        assert!(after.columns[1].tasks.is_empty());
    }

    #[test]
    fn normalize_repairs_gaps() {
        let mut col = Column::clone(&column("a", 0, &["t1", "t2"]));
        Arc::make_mut(&mut col.tasks[1]).position = 7;
        let gappy = board(vec![Arc::new(col), column("b", 1, &["t3"])]);

        let err = check_density(&gappy).expect_err("gap detected");
        assert_eq!(err.found, [0, 7]);

        let fixed = normalize(&gappy).expect("repair needed");
        check_density(&fixed).expect("dense after repair");
        assert!(Arc::ptr_eq(&gappy.columns[1], &fixed.columns[1]));
        assert!(normalize(&fixed).is_none());
    }
}
