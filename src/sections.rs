//! Section/question payload of a paper. Payloads arrive as JSON from the
//! editing UI, are validated into these types, and are stored back as
//! canonical JSON text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub q_no: String,
    pub text: String,
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blooms_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub label: String,
    #[serde(default)]
    pub instructions: String,
    pub total_marks: f64,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Parse and sanity-check a sections payload. Labels and question numbers
/// must be non-blank and marks non-negative; an empty list of sections is
/// allowed (a freshly assigned paper has no content yet).
pub fn parse_sections(raw: &serde_json::Value) -> Result<Vec<Section>, String> {
    let sections: Vec<Section> =
        serde_json::from_value(raw.clone()).map_err(|e| format!("malformed sections: {}", e))?;
    for (si, s) in sections.iter().enumerate() {
        if s.label.trim().is_empty() {
            return Err(format!("section {} has an empty label", si + 1));
        }
        if s.total_marks < 0.0 {
            return Err(format!("section '{}' has negative totalMarks", s.label));
        }
        for (qi, q) in s.questions.iter().enumerate() {
            if q.q_no.trim().is_empty() {
                return Err(format!(
                    "section '{}' question {} has an empty qNo",
                    s.label,
                    qi + 1
                ));
            }
            if q.marks < 0.0 {
                return Err(format!("question '{}' has negative marks", q.q_no));
            }
        }
    }
    Ok(sections)
}

/// Scrutiny edits may change fields of existing sections and questions but
/// may not add or remove either. The shape check lives here so a client
/// cannot bypass it.
pub fn check_scrutiny_edit(before: &[Section], after: &[Section]) -> Result<(), String> {
    if before.len() != after.len() {
        return Err(format!(
            "scrutiny may not change the number of sections ({} -> {})",
            before.len(),
            after.len()
        ));
    }
    for (old, new) in before.iter().zip(after.iter()) {
        if old.questions.len() != new.questions.len() {
            return Err(format!(
                "scrutiny may not change the number of questions in section '{}' ({} -> {})",
                old.label,
                old.questions.len(),
                new.questions.len()
            ));
        }
    }
    Ok(())
}

pub fn to_json(sections: &[Section]) -> serde_json::Value {
    serde_json::to_value(sections).unwrap_or_else(|_| serde_json::Value::Array(vec![]))
}
