use crate::ipc::error::{codes, err, ok};
use crate::ipc::helpers::{get_caller, get_required_str, require_cap, resolve_staff, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::sections;
use crate::workflow::{self, Capability, Event, Status};
use chrono::Utc;
use rusqlite::{types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct PaperRow {
    id: String,
    subject_id: String,
    department: String,
    semester: i64,
    exam_type: String,
    attempt: i64,
    setter_id: String,
    scrutiny_id: Option<String>,
    status: Status,
    sections_raw: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

fn fetch_paper(conn: &Connection, paper_id: &str) -> Result<PaperRow, HandlerErr> {
    struct Raw {
        row: PaperRow,
        status_str: String,
    }
    let raw = conn
        .query_row(
            "SELECT id, subject_id, department, semester, exam_type, attempt,
                    setter_id, scrutiny_id, status, sections, created_at, updated_at
             FROM question_papers WHERE id = ?",
            [paper_id],
            |r| {
                let status_str: String = r.get(8)?;
                Ok(Raw {
                    row: PaperRow {
                        id: r.get(0)?,
                        subject_id: r.get(1)?,
                        department: r.get(2)?,
                        semester: r.get(3)?,
                        exam_type: r.get(4)?,
                        attempt: r.get(5)?,
                        setter_id: r.get(6)?,
                        scrutiny_id: r.get(7)?,
                        status: Status::Assigned,
                        sections_raw: r.get(9)?,
                        created_at: r.get(10)?,
                        updated_at: r.get(11)?,
                    },
                    status_str,
                })
            },
        )
        .optional()
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?
        .ok_or_else(|| HandlerErr::not_found("question paper not found"))?;

    let status = Status::parse(&raw.status_str).ok_or_else(|| {
        HandlerErr::new(
            codes::DB_QUERY_FAILED,
            format!("stored status '{}' is not a known state", raw.status_str),
        )
    })?;
    Ok(PaperRow {
        status,
        ..raw.row
    })
}

fn history_json(conn: &Connection, paper_id: &str) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT action, actor_id, at, note
             FROM qp_history WHERE paper_id = ? ORDER BY seq",
        )
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    stmt.query_map([paper_id], |r| {
        Ok(json!({
            "action": r.get::<_, String>(0)?,
            "by": r.get::<_, String>(1)?,
            "at": r.get::<_, String>(2)?,
            "note": r.get::<_, Option<String>>(3)?
        }))
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))
}

fn paper_json(conn: &Connection, row: &PaperRow) -> Result<serde_json::Value, HandlerErr> {
    let sections: serde_json::Value = serde_json::from_str(&row.sections_raw)
        .unwrap_or_else(|_| serde_json::Value::Array(vec![]));
    let history = history_json(conn, &row.id)?;
    let subject = conn
        .query_row(
            "SELECT code, name FROM subjects WHERE id = ?",
            [&row.subject_id],
            |r| Ok(json!({ "code": r.get::<_, String>(0)?, "name": r.get::<_, String>(1)? })),
        )
        .optional()
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    Ok(json!({
        "id": row.id,
        "subjectId": row.subject_id,
        "subject": subject,
        "department": row.department,
        "semester": row.semester,
        "examType": row.exam_type,
        "attempt": row.attempt,
        "setterId": row.setter_id,
        "scrutinyStaffId": row.scrutiny_id,
        "status": row.status.as_str(),
        "sections": sections,
        "history": history,
        "createdAt": row.created_at,
        "updatedAt": row.updated_at
    }))
}

/// Guard an event against the transition table. A paper that exists but is
/// not in the event's From set yields `state_conflict`, which callers may
/// retry only after re-fetching current state.
fn guard(event: Event, from: Status) -> Result<Status, HandlerErr> {
    workflow::next_status(event, from).ok_or_else(|| {
        HandlerErr::new(
            codes::STATE_CONFLICT,
            format!(
                "{} is not allowed while the paper is {}",
                workflow::history_action(event),
                from.as_str()
            ),
        )
    })
}

fn require_note(params: &serde_json::Value, event: Event) -> Result<Option<String>, HandlerErr> {
    let note = params
        .get("note")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if workflow::requires_note(event) && note.is_none() {
        return Err(HandlerErr::bad_params("a non-empty note is required"));
    }
    Ok(note)
}

fn append_history(
    tx: &rusqlite::Transaction<'_>,
    paper_id: &str,
    event: Event,
    actor_id: &str,
    note: Option<&str>,
) -> Result<(), HandlerErr> {
    let seq: i64 = tx
        .query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM qp_history WHERE paper_id = ?",
            [paper_id],
            |r| r.get(0),
        )
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    tx.execute(
        "INSERT INTO qp_history(id, paper_id, seq, action, actor_id, at, note)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            paper_id,
            seq,
            workflow::history_action(event),
            actor_id,
            Utc::now().to_rfc3339(),
            note,
        ),
    )
    .map_err(|e| {
        HandlerErr::db(codes::DB_INSERT_FAILED, e).with_details(json!({ "table": "qp_history" }))
    })?;
    Ok(())
}

/// Apply a guarded transition with optimistic concurrency: the UPDATE only
/// matches if the stored status still equals the status we read. Zero rows
/// after a confirmed read means a concurrent transition won; report it as a
/// state conflict. Status change and history append share one transaction.
fn apply_transition(
    conn: &Connection,
    paper: &PaperRow,
    event: Event,
    new_status: Status,
    actor_id: &str,
    note: Option<&str>,
    new_sections: Option<&str>,
    new_scrutiny_id: Option<&str>,
) -> Result<(), HandlerErr> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db(codes::DB_TX_FAILED, e))?;

    let mut sql = String::from("UPDATE question_papers SET status = ?, updated_at = ?");
    let mut args: Vec<SqlValue> = vec![
        SqlValue::Text(new_status.as_str().to_string()),
        SqlValue::Text(Utc::now().to_rfc3339()),
    ];
    if let Some(s) = new_sections {
        sql.push_str(", sections = ?");
        args.push(SqlValue::Text(s.to_string()));
    }
    if let Some(s) = new_scrutiny_id {
        sql.push_str(", scrutiny_id = ?");
        args.push(SqlValue::Text(s.to_string()));
    }
    sql.push_str(" WHERE id = ? AND status = ?");
    args.push(SqlValue::Text(paper.id.clone()));
    args.push(SqlValue::Text(paper.status.as_str().to_string()));

    let changed = tx
        .execute(&sql, rusqlite::params_from_iter(args.iter()))
        .map_err(|e| {
            HandlerErr::db(codes::DB_UPDATE_FAILED, e)
                .with_details(json!({ "table": "question_papers" }))
        })?;
    if changed == 0 {
        let _ = tx.rollback();
        return Err(HandlerErr::new(
            codes::STATE_CONFLICT,
            "the paper changed state concurrently; re-fetch and retry",
        ));
    }

    append_history(&tx, &paper.id, event, actor_id, note)?;
    tx.commit()
        .map_err(|e| HandlerErr::db(codes::DB_COMMIT_FAILED, e))?;
    Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// CreateAndAssign
// ---------------------------------------------------------------------------

fn papers_assign(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::AssignPaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let subject_id = get_required_str(params, "subjectId")?;
    let exam_type = get_required_str(params, "examType")?.trim().to_string();
    if exam_type.is_empty() {
        return Err(HandlerErr::bad_params("examType must not be empty"));
    }
    let attempt = params.get("attempt").and_then(|v| v.as_i64()).unwrap_or(1);
    if attempt < 1 {
        return Err(HandlerErr::bad_params("attempt must be a positive integer"));
    }
    let setter_raw = get_required_str(params, "setterId")?;
    let setter_id = resolve_staff(conn, &setter_raw)?;

    // Department and semester are copied from the subject now and never
    // re-synced afterwards.
    let subject = conn
        .query_row(
            "SELECT department, semester FROM subjects WHERE id = ?",
            [&subject_id],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
        )
        .optional()
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?
        .ok_or_else(|| HandlerErr::not_found("subject not found"))?;
    let (department, semester) = subject;

    // Friendly pre-check; the unique index closes the race below.
    let exists = conn
        .query_row(
            "SELECT 1 FROM question_papers
             WHERE subject_id = ? AND exam_type = ? AND attempt = ? AND setter_id = ?",
            (&subject_id, &exam_type, attempt, &setter_id),
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?
        .is_some();
    if exists {
        return Err(HandlerErr::new(
            codes::DUPLICATE_ASSIGNMENT,
            "this setter is already assigned for this subject, exam type and attempt",
        ));
    }

    let paper_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db(codes::DB_TX_FAILED, e))?;
    let insert = tx.execute(
        "INSERT INTO question_papers(
             id, subject_id, department, semester, exam_type, attempt,
             setter_id, scrutiny_id, status, sections, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, NULL, ?, '[]', ?, ?)",
        (
            &paper_id,
            &subject_id,
            &department,
            semester,
            &exam_type,
            attempt,
            &setter_id,
            Status::Assigned.as_str(),
            &now,
            &now,
        ),
    );
    if let Err(e) = insert {
        let _ = tx.rollback();
        if is_unique_violation(&e) {
            return Err(HandlerErr::new(
                codes::DUPLICATE_ASSIGNMENT,
                "this setter is already assigned for this subject, exam type and attempt",
            ));
        }
        return Err(HandlerErr::db(codes::DB_INSERT_FAILED, e)
            .with_details(json!({ "table": "question_papers" })));
    }
    append_history(&tx, &paper_id, Event::Assign, &actor_id, None)?;
    tx.commit()
        .map_err(|e| HandlerErr::db(codes::DB_COMMIT_FAILED, e))?;

    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

// ---------------------------------------------------------------------------
// Setter-side transitions
// ---------------------------------------------------------------------------

fn papers_edit_sections(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::AuthorPaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;

    // Ownership before state: a non-owner is told "not yours" even when the
    // paper is also in the wrong state.
    if paper.setter_id != actor_id {
        return Err(HandlerErr::new(
            codes::UNAUTHORIZED,
            "not your assignment",
        ));
    }

    let new_status = guard(Event::SetterEdit, paper.status)?;
    let raw = params
        .get("sections")
        .ok_or_else(|| HandlerErr::bad_params("missing sections"))?;
    let parsed = sections::parse_sections(raw).map_err(HandlerErr::bad_params)?;
    let canonical = sections::to_json(&parsed).to_string();

    apply_transition(
        conn,
        &paper,
        Event::SetterEdit,
        new_status,
        &actor_id,
        None,
        Some(&canonical),
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

fn papers_submit_to_coe(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::AuthorPaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    if paper.setter_id != actor_id {
        return Err(HandlerErr::new(
            codes::UNAUTHORIZED,
            "not your assignment",
        ));
    }

    let new_status = guard(Event::SubmitToCoe, paper.status)?;
    apply_transition(
        conn,
        &paper,
        Event::SubmitToCoe,
        new_status,
        &actor_id,
        None,
        None,
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

// ---------------------------------------------------------------------------
// Exam-office routing and decisions
// ---------------------------------------------------------------------------

fn papers_send_to_scrutiny(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::RouteScrutiny)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let scrutiny_raw = get_required_str(params, "scrutinyStaffId")?;
    let scrutiny_id = resolve_staff(conn, &scrutiny_raw)?;

    let paper = fetch_paper(conn, &paper_id)?;
    let new_status = guard(Event::SendToScrutiny, paper.status)?;
    apply_transition(
        conn,
        &paper,
        Event::SendToScrutiny,
        new_status,
        &actor_id,
        None,
        None,
        Some(&scrutiny_id),
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

fn papers_approve(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::DecidePaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    let new_status = guard(Event::Approve, paper.status)?;
    let note = require_note(params, Event::Approve)?;
    apply_transition(
        conn,
        &paper,
        Event::Approve,
        new_status,
        &actor_id,
        note.as_deref(),
        None,
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

fn papers_send_back(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::DecidePaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    let new_status = guard(Event::SendBack, paper.status)?;
    let note = require_note(params, Event::SendBack)?;
    apply_transition(
        conn,
        &paper,
        Event::SendBack,
        new_status,
        &actor_id,
        note.as_deref(),
        None,
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

// ---------------------------------------------------------------------------
// Scrutiny-side transitions
// ---------------------------------------------------------------------------

fn papers_scrutiny_edit(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::AuthorPaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    if paper.scrutiny_id.as_deref() != Some(actor_id.as_str()) {
        return Err(HandlerErr::new(
            codes::UNAUTHORIZED,
            "not assigned to you for scrutiny",
        ));
    }

    let new_status = guard(Event::ScrutinyEdit, paper.status)?;

    let raw = params
        .get("sections")
        .ok_or_else(|| HandlerErr::bad_params("missing sections"))?;
    let edited = sections::parse_sections(raw).map_err(HandlerErr::bad_params)?;
    let current: Vec<sections::Section> =
        serde_json::from_str(&paper.sections_raw).unwrap_or_default();
    // Scrutiny may change fields but not the paper's shape.
    sections::check_scrutiny_edit(&current, &edited).map_err(HandlerErr::bad_params)?;
    let canonical = sections::to_json(&edited).to_string();

    apply_transition(
        conn,
        &paper,
        Event::ScrutinyEdit,
        new_status,
        &actor_id,
        None,
        Some(&canonical),
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

fn papers_scrutiny_submit(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::AuthorPaper)?;
    let actor_id = resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    if paper.scrutiny_id.as_deref() != Some(actor_id.as_str()) {
        return Err(HandlerErr::new(
            codes::UNAUTHORIZED,
            "not assigned to you for scrutiny",
        ));
    }

    let new_status = guard(Event::ScrutinySubmit, paper.status)?;
    let note = require_note(params, Event::ScrutinySubmit)?;
    apply_transition(
        conn,
        &paper,
        Event::ScrutinySubmit,
        new_status,
        &actor_id,
        note.as_deref(),
        None,
        None,
    )?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

// ---------------------------------------------------------------------------
// Delete escape hatch
// ---------------------------------------------------------------------------

fn papers_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::DeletePaper)?;
    resolve_staff(conn, &caller.raw_user_id)?;

    let paper_id = get_required_str(params, "paperId")?;
    let paper = fetch_paper(conn, &paper_id)?;
    guard(Event::Delete, paper.status)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db(codes::DB_TX_FAILED, e))?;
    if let Err(e) = tx.execute("DELETE FROM qp_history WHERE paper_id = ?", [&paper_id]) {
        let _ = tx.rollback();
        return Err(HandlerErr::db(codes::DB_DELETE_FAILED, e)
            .with_details(json!({ "table": "qp_history" })));
    }
    // Conditional delete: an approval racing this call wins.
    let removed = match tx.execute(
        "DELETE FROM question_papers WHERE id = ? AND status = ?",
        (&paper_id, paper.status.as_str()),
    ) {
        Ok(n) => n,
        Err(e) => {
            let _ = tx.rollback();
            return Err(HandlerErr::db(codes::DB_DELETE_FAILED, e)
                .with_details(json!({ "table": "question_papers" })));
        }
    };
    if removed == 0 {
        let _ = tx.rollback();
        return Err(HandlerErr::new(
            codes::STATE_CONFLICT,
            "the paper changed state concurrently; re-fetch and retry",
        ));
    }
    tx.commit()
        .map_err(|e| HandlerErr::db(codes::DB_COMMIT_FAILED, e))?;

    Ok(json!({ "deleted": true, "paperId": paper_id }))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn papers_open(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let paper_id = get_required_str(params, "paperId")?;
    let row = fetch_paper(conn, &paper_id)?;
    paper_json(conn, &row)
}

fn list_filtered(
    conn: &Connection,
    mut sql: String,
    mut args: Vec<SqlValue>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    if let Some(d) = params.get("department").and_then(|v| v.as_str()) {
        sql.push_str(" AND p.department = ?");
        args.push(SqlValue::Text(d.to_string()));
    }
    if let Some(s) = params.get("semester").and_then(|v| v.as_i64()) {
        sql.push_str(" AND p.semester = ?");
        args.push(SqlValue::Integer(s));
    }
    if let Some(e) = params.get("examType").and_then(|v| v.as_str()) {
        sql.push_str(" AND p.exam_type = ?");
        args.push(SqlValue::Text(e.to_string()));
    }
    if let Some(st) = params.get("status").and_then(|v| v.as_str()) {
        let status = Status::parse(st)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown status: {}", st)))?;
        sql.push_str(" AND p.status = ?");
        args.push(SqlValue::Text(status.as_str().to_string()));
    }
    sql.push_str(" ORDER BY p.created_at");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "subjectCode": r.get::<_, Option<String>>(2)?,
                "subjectName": r.get::<_, Option<String>>(3)?,
                "department": r.get::<_, String>(4)?,
                "semester": r.get::<_, i64>(5)?,
                "examType": r.get::<_, String>(6)?,
                "attempt": r.get::<_, i64>(7)?,
                "setterId": r.get::<_, String>(8)?,
                "scrutinyStaffId": r.get::<_, Option<String>>(9)?,
                "status": r.get::<_, String>(10)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db(codes::DB_QUERY_FAILED, e))?;
    Ok(json!({ "papers": rows }))
}

const LIST_COLUMNS: &str = "SELECT p.id, p.subject_id, s.code, s.name, p.department, p.semester,
            p.exam_type, p.attempt, p.setter_id, p.scrutiny_id, p.status
     FROM question_papers p LEFT JOIN subjects s ON s.id = p.subject_id";

fn papers_list_mine(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    let me = resolve_staff(conn, &caller.raw_user_id)?;
    let sql = format!("{} WHERE p.setter_id = ?", LIST_COLUMNS);
    list_filtered(conn, sql, vec![SqlValue::Text(me)], params)
}

fn papers_list_scrutiny(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    let me = resolve_staff(conn, &caller.raw_user_id)?;
    let sql = format!("{} WHERE p.scrutiny_id = ?", LIST_COLUMNS);
    list_filtered(conn, sql, vec![SqlValue::Text(me)], params)
}

fn papers_list_locked(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::ViewAllPapers)?;
    let sql = format!("{} WHERE p.status IN (?, ?)", LIST_COLUMNS);
    list_filtered(
        conn,
        sql,
        vec![
            SqlValue::Text(Status::SubmittedToCoeAfterScrutiny.as_str().to_string()),
            SqlValue::Text(Status::ApprovedLocked.as_str().to_string()),
        ],
        params,
    )
}

fn papers_list_all(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let caller = get_caller(params)?;
    require_cap(&caller, Capability::ViewAllPapers)?;
    let sql = format!("{} WHERE 1 = 1", LIST_COLUMNS);
    list_filtered(conn, sql, Vec::new(), params)
}

// ---------------------------------------------------------------------------

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
        "papers.assign" => Some(with_db(state, req, papers_assign)),
        "papers.editSections" => Some(with_db(state, req, papers_edit_sections)),
        "papers.submitToCoe" => Some(with_db(state, req, papers_submit_to_coe)),
        "papers.sendToScrutiny" => Some(with_db(state, req, papers_send_to_scrutiny)),
        "papers.scrutinyEditSections" => Some(with_db(state, req, papers_scrutiny_edit)),
        "papers.scrutinySubmit" => Some(with_db(state, req, papers_scrutiny_submit)),
        "papers.approve" => Some(with_db(state, req, papers_approve)),
        "papers.sendBack" => Some(with_db(state, req, papers_send_back)),
        "papers.delete" => Some(with_db(state, req, papers_delete)),
        "papers.open" => Some(with_db(state, req, papers_open)),
        "papers.listMine" => Some(with_db(state, req, papers_list_mine)),
        "papers.listScrutiny" => Some(with_db(state, req, papers_list_scrutiny)),
        "papers.listLocked" => Some(with_db(state, req, papers_list_locked)),
        "papers.listAll" => Some(with_db(state, req, papers_list_all)),
        _ => None,
    }
}
