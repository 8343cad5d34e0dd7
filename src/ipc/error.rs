use serde_json::json;

/// Stable error codes of the JSON envelope. Workflow callers rely on the
/// distinction between `state_conflict` (retryable after a re-fetch),
/// `unauthorized` (not retryable) and `bad_params` (fix the input).
pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE_ASSIGNMENT: &str = "duplicate_assignment";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const STATE_CONFLICT: &str = "state_conflict";
    pub const BAD_PARAMS: &str = "bad_params";
    pub const IDENTITY_UNRESOLVED: &str = "identity_unresolved";
    pub const NO_WORKSPACE: &str = "no_workspace";
    pub const DB_QUERY_FAILED: &str = "db_query_failed";
    pub const DB_INSERT_FAILED: &str = "db_insert_failed";
    pub const DB_UPDATE_FAILED: &str = "db_update_failed";
    pub const DB_DELETE_FAILED: &str = "db_delete_failed";
    pub const DB_TX_FAILED: &str = "db_tx_failed";
    pub const DB_COMMIT_FAILED: &str = "db_commit_failed";
    pub const NOT_IMPLEMENTED: &str = "not_implemented";
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}
