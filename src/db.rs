use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("qpflow.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id TEXT PRIMARY KEY,
            external_id TEXT UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            department TEXT NOT NULL DEFAULT '',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_staff_role ON staff(role)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_staff_department ON staff(department)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            UNIQUE(code, department)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_department ON subjects(department)",
        [],
    )?;

    // department/semester are denormalized copies taken from the subject at
    // assignment time; they are not re-synced if the subject changes later.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS question_papers(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            exam_type TEXT NOT NULL,
            attempt INTEGER NOT NULL DEFAULT 1,
            setter_id TEXT NOT NULL,
            scrutiny_id TEXT,
            status TEXT NOT NULL,
            sections TEXT NOT NULL DEFAULT '[]',
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(setter_id) REFERENCES staff(id),
            FOREIGN KEY(scrutiny_id) REFERENCES staff(id),
            UNIQUE(subject_id, exam_type, attempt, setter_id)
        )",
        [],
    )?;
    ensure_question_papers_attempt(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_papers_setter ON question_papers(setter_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_papers_scrutiny ON question_papers(scrutiny_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_papers_status ON question_papers(status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_papers_department ON question_papers(department)",
        [],
    )?;

    // Append-only audit log. seq is 1-based per paper; rows are never
    // updated or deleted except when the paper itself is deleted.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS qp_history(
            id TEXT PRIMARY KEY,
            paper_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            action TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            at TEXT NOT NULL,
            note TEXT,
            FOREIGN KEY(paper_id) REFERENCES question_papers(id),
            UNIQUE(paper_id, seq)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_qp_history_paper ON qp_history(paper_id, seq)",
        [],
    )?;

    Ok(conn)
}

// Early workspaces predate supplementary papers and have no attempt column.
fn ensure_question_papers_attempt(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "question_papers", "attempt")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE question_papers ADD COLUMN attempt INTEGER NOT NULL DEFAULT 1",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
