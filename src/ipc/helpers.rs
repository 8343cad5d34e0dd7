use crate::identity;
use crate::ipc::error::{codes, err};
use crate::workflow::{role_can, Capability, Role};
use rusqlite::Connection;

/// Handler-level failure, mapped to the error envelope at the edge.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::new(codes::BAD_PARAMS, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HandlerErr::new(codes::NOT_FOUND, message)
    }

    pub fn db(code: &'static str, e: rusqlite::Error) -> Self {
        HandlerErr::new(code, e.to_string())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Caller context supplied by the authentication boundary. Trusted input:
/// the role is taken at face value, but the user id still goes through
/// identity resolution before it is compared or stored.
pub struct Caller {
    pub raw_user_id: String,
    pub role: Role,
    pub department: String,
}

pub fn get_caller(params: &serde_json::Value) -> Result<Caller, HandlerErr> {
    let Some(caller) = params.get("caller") else {
        return Err(HandlerErr::bad_params("missing caller"));
    };
    let raw_user_id = get_required_str(caller, "userId")?;
    let role_str = get_required_str(caller, "role")?;
    let role = Role::parse(&role_str)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", role_str)))?;
    let department = caller
        .get("department")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    Ok(Caller {
        raw_user_id,
        role,
        department,
    })
}

pub fn require_cap(caller: &Caller, cap: Capability) -> Result<(), HandlerErr> {
    if role_can(caller.role, cap) {
        return Ok(());
    }
    Err(HandlerErr::new(
        codes::UNAUTHORIZED,
        format!("role {} may not perform this operation", caller.role.as_str()),
    ))
}

/// Resolve a staff identifier (internal or external scheme) or fail with
/// `identity_unresolved`.
pub fn resolve_staff(conn: &Connection, raw: &str) -> Result<String, HandlerErr> {
    identity::resolve_staff_id(conn, raw)
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?
        .ok_or_else(|| {
            HandlerErr::new(
                codes::IDENTITY_UNRESOLVED,
                format!("no staff record matches identifier '{}'", raw),
            )
        })
}
