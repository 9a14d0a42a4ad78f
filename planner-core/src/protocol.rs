use serde::{Deserialize, Serialize};

use crate::models::TaskStatus;

/// A to-do as the remote source reports it. Every field is optional on the
/// wire; `id` in particular may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Envelope wrapped around every REST response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub is_success: bool,
    pub code: Option<String>,
    pub message: Option<String>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    pub id: i64,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_record_tolerates_missing_fields() {
        let record: RemoteTaskRecord = serde_json::from_value(json!({
            "title": "Korean non-fiction, 2 passages",
            "status": "NOT_COMPLETED"
        }))
        .unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.start_time, None);
        assert_eq!(record.status.as_deref(), Some("NOT_COMPLETED"));
    }

    #[test]
    fn test_change_status_request_wire_shape() {
        let req = ChangeStatusRequest {
            id: 5,
            status: TaskStatus::Completed,
            start_time: Some("2026-02-02T14:00:00".to_string()),
            end_time: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": 5, "status": "COMPLETED", "startTime": "2026-02-02T14:00:00"})
        );
    }

    #[test]
    fn test_envelope_without_result() {
        let res: ApiResponse<Vec<RemoteTaskRecord>> = serde_json::from_value(json!({
            "isSuccess": false,
            "code": "TODO404",
            "message": "not found"
        }))
        .unwrap();
        assert!(!res.is_success);
        assert!(res.result.is_none());
    }
}
