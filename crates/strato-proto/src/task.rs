//! Asynchronous task objects.
//!
//! Every mutating call against the control plane returns a [`Task`]. The
//! server owns the task and advances its [`TaskState`]; the client only reads
//! it until it reaches a terminal state.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::resources::ApiErrorBody;

/// State of a server-side task.
///
/// The set of states is closed: any string the client does not know maps to
/// [`TaskState::Unrecognized`] instead of failing to decode, so callers can
/// reject it explicitly rather than guess its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    /// Accepted, waiting to run.
    Queued,
    /// Picked up by the server.
    Started,
    /// Running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// A state string this client does not understand.
    Unrecognized(String),
}

impl TaskState {
    /// Returns true for `Completed` and `Error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true for the known non-terminal states.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Started | Self::InProgress)
    }

    /// Wire representation of this state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Started => "STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Unrecognized(s) => s,
        }
    }
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QUEUED" => Self::Queued,
            "STARTED" => Self::Started,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "ERROR" => Self::Error,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<&str> for TaskState {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Unrecognized(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the resource a task acts upon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Resource kind, e.g. `cluster` or `host`.
    #[serde(default)]
    pub kind: String,
    /// Resource id.
    #[serde(default)]
    pub id: String,
}

/// One step of a multi-step task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStep {
    /// Step operation name.
    #[serde(default)]
    pub operation: String,
    /// Step state.
    #[serde(default)]
    pub state: String,
    /// Errors reported by this step.
    #[serde(default)]
    pub errors: Vec<ApiErrorBody>,
}

/// A server-side asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id assigned by the server.
    #[serde(default)]
    pub id: String,
    /// Operation name, e.g. `CREATE_CLUSTER`.
    #[serde(default)]
    pub operation: String,
    /// Current state.
    pub state: TaskState,
    /// Resource this task acts upon.
    #[serde(default)]
    pub entity: Entity,
    /// Free-form result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_properties: Option<serde_json::Value>,
    /// Task steps, carrying errors on failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TaskStep>,
    /// Queue time in epoch milliseconds.
    #[serde(default)]
    pub queued_time: i64,
    /// Start time in epoch milliseconds.
    #[serde(default)]
    pub started_time: i64,
    /// End time in epoch milliseconds.
    #[serde(default)]
    pub end_time: i64,
}

impl Task {
    /// Create a task with the given id, operation and state.
    #[must_use]
    pub fn new(id: impl Into<String>, operation: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            operation: operation.into(),
            state,
            entity: Entity::default(),
            resource_properties: None,
            steps: Vec::new(),
            queued_time: 0,
            started_time: 0,
            end_time: 0,
        }
    }

    /// Attach an entity reference.
    #[must_use]
    pub fn with_entity(mut self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        self.entity = Entity {
            kind: kind.into(),
            id: id.into(),
        };
        self
    }

    /// Attach a step error.
    #[must_use]
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.steps.push(TaskStep {
            operation: self.operation.clone(),
            state: "ERROR".into(),
            errors: vec![ApiErrorBody {
                code: code.into(),
                message: message.into(),
                data: None,
            }],
        });
        self
    }

    /// All step error messages joined into one line.
    ///
    /// Falls back to a generic message when the server reported none.
    #[must_use]
    pub fn error_message(&self) -> String {
        let messages: Vec<String> = self
            .steps
            .iter()
            .flat_map(|step| step.errors.iter())
            .map(|e| {
                if e.code.is_empty() {
                    e.message.clone()
                } else {
                    format!("{} ({})", e.message, e.code)
                }
            })
            .collect();

        if messages.is_empty() {
            format!("task {} ended in state {}", self.id, self.state)
        } else {
            messages.join("; ")
        }
    }

    /// Start time as a UTC timestamp, if the server reported one.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        millis_to_utc(self.started_time)
    }

    /// End time as a UTC timestamp, if the server reported one.
    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        millis_to_utc(self.end_time)
    }
}

fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    if ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}
