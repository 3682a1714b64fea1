//! [`RemoteStore`] over the kanban JSON API.
//!
//! | operation      | request                                   |
//! |----------------|-------------------------------------------|
//! | batch / beacon | `POST   /api/tasks/batch-update` `{updates}` |
//! | create task    | `POST   /api/tasks`                       |
//! | create column  | `POST   /api/columns`                     |
//! | delete task    | `DELETE /api/tasks/{id}`                  |
//! | update task    | `PATCH  /api/tasks/{id}`                  |
//!
//! Non-2xx answers map to [`RemoteError::Status`], connection problems to
//! [`RemoteError::Transport`] and bodies that don't decode to
//! [`RemoteError::Decode`].

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use kanban_core::model::{Column, NewColumn, NewTask, PendingUpdate, Task, TaskId, TaskPatch};
use kanban_core::remote::{BatchReceipt, RemoteError, RemoteStore};
use serde::Serialize;
use serde::de::DeserializeOwned;

const BATCH_PATH: &str = "/api/tasks/batch-update";

#[derive(Serialize)]
struct BatchBody<'a> {
    updates: &'a [PendingUpdate],
}

/// Blocking HTTP client for the kanban API.
///
/// Clones share the connection pool and the list of outstanding beacons.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: Option<String>,
    agent: ureq::Agent,
    beacons: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    /// `base_url` of `None` builds a client whose every call fails with a
    /// transport error, so offline-only commands keep working.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("kanban-cli/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            agent,
            beacons: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn url(&self, path: &str) -> Result<String, RemoteError> {
        self.base_url.as_ref().map_or_else(
            || {
                Err(RemoteError::Transport(
                    "no remote configured (set KANBAN_REMOTE or remote.base_url)".into(),
                ))
            },
            |base| Ok(format!("{base}{path}")),
        )
    }

    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let url = self.url(path)?;
        tracing::debug!(method, url = %url, "remote request");
        let response = self
            .agent
            .request(method, &url)
            .send_json(body)
            .map_err(map_ureq_error)?;
        response
            .into_json::<T>()
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }

    /// Wait up to `timeout` for outstanding beacons to finish.
    ///
    /// Returns the number still running when the wait ended.
    pub fn settle_beacons(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let mut handles = self.beacons.lock().unwrap_or_else(PoisonError::into_inner);
            handles.retain(|handle| !handle.is_finished());
            if handles.is_empty() || Instant::now() >= deadline {
                return handles.len();
            }
            drop(handles);
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => RemoteError::Status {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

impl RemoteStore for HttpRemote {
    fn apply_batch(&self, updates: &[PendingUpdate]) -> Result<BatchReceipt, RemoteError> {
        let receipt: BatchReceipt = self.send("POST", BATCH_PATH, &BatchBody { updates })?;
        if receipt.success {
            Ok(receipt)
        } else {
            Err(RemoteError::Rejected("batch update reported failure".into()))
        }
    }

    fn send_beacon(&self, updates: &[PendingUpdate]) -> bool {
        let Ok(url) = self.url(BATCH_PATH) else {
            return false;
        };
        let Ok(body) = serde_json::to_value(BatchBody { updates }) else {
            return false;
        };

        let agent = self.agent.clone();
        let spawned = std::thread::Builder::new()
            .name("kanban-beacon".into())
            .spawn(move || {
                if let Err(err) = agent.post(&url).send_json(body) {
                    tracing::debug!("beacon delivery failed: {err}");
                }
            });

        match spawned {
            Ok(handle) => {
                self.beacons
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
                true
            }
            Err(err) => {
                tracing::warn!("could not spawn beacon thread: {err}");
                false
            }
        }
    }

    fn create_task(&self, request: &NewTask) -> Result<Task, RemoteError> {
        self.send("POST", "/api/tasks", request)
    }

    fn create_column(&self, request: &NewColumn) -> Result<Column, RemoteError> {
        self.send("POST", "/api/columns", request)
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<(), RemoteError> {
        let url = self.url(&format!("/api/tasks/{task_id}"))?;
        tracing::debug!(method = "DELETE", url = %url, "remote request");
        self.agent
            .delete(&url)
            .call()
            .map(|_| ())
            .map_err(map_ureq_error)
    }

    fn update_task(&self, task_id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        self.send("PATCH", &format!("/api/tasks/{task_id}"), patch)
    }
}
