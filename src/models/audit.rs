use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub const EVENT_TYPE_FILE: &str = "file";
pub const EVENT_ACTION_UPLOADED: &str = "uploaded";

/// Append-only trace of a user visible action. The id is assigned when the
/// event is created so a retried write can be deduplicated by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub event_type: String,
    pub event_action: String,
    pub event_data: Value,
    pub created_at: NaiveDateTime,
}

impl AuditEvent {
    pub fn file_uploaded(project_id: Uuid, user_id: Uuid, file_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            event_type: EVENT_TYPE_FILE.to_string(),
            event_action: EVENT_ACTION_UPLOADED.to_string(),
            event_data: json!({ "file_name": file_name }),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
