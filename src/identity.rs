//! Staff identifiers arrive in two schemes: the canonical internal row id,
//! or the id issued by the external identity provider. Every place that
//! attaches a person to a paper goes through the same resolution step so
//! ownership comparisons always work on canonical ids.

use rusqlite::{Connection, OptionalExtension};

/// Resolve a caller-supplied staff identifier to the canonical internal id.
/// Internal ids win; the external scheme is tried second. `Ok(None)` means
/// no active staff record matches either scheme.
pub fn resolve_staff_id(conn: &Connection, raw: &str) -> rusqlite::Result<Option<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Some(id) = conn
        .query_row(
            "SELECT id FROM staff WHERE id = ? AND active = 1",
            [raw],
            |r| r.get::<_, String>(0),
        )
        .optional()?
    {
        return Ok(Some(id));
    }

    conn.query_row(
        "SELECT id FROM staff WHERE external_id = ? AND active = 1",
        [raw],
        |r| r.get::<_, String>(0),
    )
    .optional()
}
