//! Request payloads for the CRUD endpoints of the remote store.

use serde::Serialize;

use super::ids::{BoardId, ColumnId, WorkspaceId};

/// Body of a create-task request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
    pub workspace_id: WorkspaceId,
}

/// Body of a create-column request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub board_id: BoardId,
    pub name: String,
    /// Requested rank; the local board length at request time.
    pub position: usize,
    pub workspace_id: WorkspaceId,
}

/// Partial update of a task's content fields.
///
/// `None` leaves a field untouched. For `description`, `Some(None)` clears it
/// (serialized as JSON `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl TaskPatch {
    /// Returns `true` when the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_omits_untouched_fields() {
        let patch = TaskPatch {
            title: Some("Renamed".into()),
            description: None,
        };
        let json = serde_json::to_string(&patch).expect("serialize");
        assert_eq!(json, r#"{"title":"Renamed"}"#);
    }

    #[test]
    fn patch_clearing_description_sends_null() {
        let patch = TaskPatch {
            title: None,
            description: Some(None),
        };
        let json = serde_json::to_string(&patch).expect("serialize");
        assert_eq!(json, r#"{"description":null}"#);
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn new_task_uses_wire_field_names() {
        let req = NewTask {
            column_id: ColumnId::new("c1"),
            title: "Write docs".into(),
            description: None,
            workspace_id: WorkspaceId::new("ws"),
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["columnId"], "c1");
        assert_eq!(json["workspaceId"], "ws");
        assert!(json["description"].is_null());
    }
}
