use crate::ipc::error::{codes, err, ok};
use crate::ipc::helpers::{get_caller, get_required_str, require_cap, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::workflow::{Capability, Role};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn staff_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::ManageDirectory)?;

    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let role_str = get_required_str(params, "role")?;
    let role = Role::parse(&role_str)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", role_str)))?;
    let department = params
        .get("department")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let external_id = params
        .get("externalId")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let staff_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO staff(id, external_id, name, role, department, active, created_at)
         VALUES(?, ?, ?, ?, ?, 1, ?)",
        (
            &staff_id,
            &external_id,
            &name,
            role.as_str(),
            &department,
            &created_at,
        ),
    )
    .map_err(|e| {
        HandlerErr::db(codes::DB_INSERT_FAILED, e).with_details(json!({ "table": "staff" }))
    })?;

    Ok(json!({
        "staffId": staff_id,
        "name": name,
        "role": role.as_str(),
        "department": department,
        "externalId": external_id
    }))
}

fn staff_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let role = params.get("role").and_then(|v| v.as_str());
    let department = params.get("department").and_then(|v| v.as_str());

    let mut sql = String::from(
        "SELECT id, external_id, name, role, department, active
         FROM staff WHERE 1 = 1",
    );
    let mut args: Vec<String> = Vec::new();
    if let Some(r) = role {
        sql.push_str(" AND role = ?");
        args.push(r.to_string());
    }
    if let Some(d) = department {
        sql.push_str(" AND department = ?");
        args.push(d.to_string());
    }
    sql.push_str(" ORDER BY name");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "externalId": r.get::<_, Option<String>>(1)?,
                "name": r.get::<_, String>(2)?,
                "role": r.get::<_, String>(3)?,
                "department": r.get::<_, String>(4)?,
                "active": r.get::<_, i64>(5)? != 0
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;

    Ok(json!({ "staff": rows }))
}

fn with_db(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, codes::NO_WORKSPACE, "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.create" => Some(with_db(state, req, staff_create)),
        "staff.list" => Some(with_db(state, req, staff_list)),
        _ => None,
    }
}
