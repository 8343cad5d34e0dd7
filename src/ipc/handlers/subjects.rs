use crate::ipc::error::{codes, err, ok};
use crate::ipc::helpers::{get_caller, get_required_str, require_cap, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::workflow::Capability;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn subjects_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::ManageDirectory)?;

    let code = get_required_str(params, "code")?
        .trim()
        .to_ascii_uppercase();
    if code.is_empty() {
        return Err(HandlerErr::bad_params("code must not be empty"));
    }
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let department = get_required_str(params, "department")?.trim().to_string();
    if department.is_empty() {
        return Err(HandlerErr::bad_params("department must not be empty"));
    }
    let semester = params
        .get("semester")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing semester"))?;
    if !(1..=8).contains(&semester) {
        return Err(HandlerErr::bad_params("semester must be between 1 and 8"));
    }

    let subject_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, code, name, department, semester)
         VALUES(?, ?, ?, ?, ?)",
        (&subject_id, &code, &name, &department, semester),
    )
    .map_err(|e| {
        HandlerErr::db(codes::DB_INSERT_FAILED, e).with_details(json!({ "table": "subjects" }))
    })?;

    Ok(json!({
        "subjectId": subject_id,
        "code": code,
        "name": name,
        "department": department,
        "semester": semester
    }))
}

fn subjects_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let department = params.get("department").and_then(|v| v.as_str());
    let semester = params.get("semester").and_then(|v| v.as_i64());

    let mut sql =
        String::from("SELECT id, code, name, department, semester FROM subjects WHERE 1 = 1");
    let mut args: Vec<rusqlite::types::Value> = Vec::new();
    if let Some(d) = department {
        sql.push_str(" AND department = ?");
        args.push(rusqlite::types::Value::Text(d.to_string()));
    }
    if let Some(s) = semester {
        sql.push_str(" AND semester = ?");
        args.push(rusqlite::types::Value::Integer(s));
    }
    sql.push_str(" ORDER BY department, semester, code");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "code": r.get::<_, String>(1)?,
                "name": r.get::<_, String>(2)?,
                "department": r.get::<_, String>(3)?,
                "semester": r.get::<_, i64>(4)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;

    Ok(json!({ "subjects": rows }))
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
        "subjects.create" => Some(with_db(state, req, subjects_create)),
        "subjects.list" => Some(with_db(state, req, subjects_list)),
        _ => None,
    }
}
