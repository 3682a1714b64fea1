//! Opaque identifiers for boards, columns, tasks and workspaces.
//!
//! Ids are assigned by the remote store and never interpreted locally. Each
//! kind gets its own newtype so a `ColumnId` can't be passed where a `TaskId`
//! is expected. All of them serialize as bare JSON strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a task.
    TaskId
);
string_id!(
    /// Identifier of a column within a board.
    ColumnId
);
string_id!(
    /// Identifier of a board.
    BoardId
);
string_id!(
    /// Identifier of the workspace (tenant/team) that scopes a board and its cache.
    WorkspaceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("task-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"task-1\"");

        let back: TaskId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_raw_value() {
        assert_eq!(ColumnId::from("todo").to_string(), "todo");
        assert_eq!(WorkspaceId::from("team-a".to_string()).as_str(), "team-a");
    }
}
