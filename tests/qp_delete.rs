use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_qpflowd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn qpflowd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn expect_ok(resp: &Value, what: &str) -> Value {
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        what,
        resp
    );
    resp.get("result").cloned().expect("result")
}

fn error_code(resp: &Value) -> String {
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "expected an error: {}",
        resp
    );
    resp["error"]["code"].as_str().expect("error code").to_string()
}

fn caller(user_id: &str, role: &str) -> Value {
    json!({ "userId": user_id, "role": role, "department": "CS" })
}

#[test]
fn delete_removes_erroneous_assignments_but_never_approved_papers() {
    let workspace = temp_dir("qpflow-delete");
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        ),
        "workspace.select",
    );
    let coe = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "2",
            "staff.create",
            json!({
                "caller": caller("bootstrap", "Admin"),
                "name": "Controller",
                "role": "COE"
            }),
        ),
        "staff.create",
    )["staffId"]
        .as_str()
        .expect("staffId")
        .to_string();
    let setter = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "3",
            "staff.create",
            json!({
                "caller": caller("bootstrap", "Admin"),
                "name": "Setter",
                "role": "Staff",
                "department": "CS"
            }),
        ),
        "staff.create",
    )["staffId"]
        .as_str()
        .expect("staffId")
        .to_string();
    let subject = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "4",
            "subjects.create",
            json!({
                "caller": caller("bootstrap", "Admin"),
                "code": "CS301",
                "name": "Operating Systems",
                "department": "CS",
                "semester": 3
            }),
        ),
        "subjects.create",
    )["subjectId"]
        .as_str()
        .expect("subjectId")
        .to_string();

    // A mistaken assignment can be discarded outright.
    let mistaken = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "5",
            "papers.assign",
            json!({
                "caller": caller(&coe, "COE"),
                "subjectId": subject,
                "examType": "IA2",
                "setterId": setter
            }),
        ),
        "papers.assign",
    )["id"]
        .as_str()
        .expect("paper id")
        .to_string();
    let deleted = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "6",
            "papers.delete",
            json!({ "caller": caller(&coe, "COE"), "paperId": mistaken }),
        ),
        "papers.delete",
    );
    assert_eq!(deleted["deleted"], true);
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "papers.open",
        json!({ "paperId": mistaken }),
    );
    assert_eq!(error_code(&resp), "not_found");

    // The freed slot is assignable again.
    let replacement = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "8",
            "papers.assign",
            json!({
                "caller": caller(&coe, "COE"),
                "subjectId": subject,
                "examType": "IA2",
                "setterId": setter
            }),
        ),
        "re-assign",
    )["id"]
        .as_str()
        .expect("paper id")
        .to_string();

    // Approve it, then confirm deletion is refused.
    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "9",
            "papers.editSections",
            json!({
                "caller": caller(&setter, "Staff"),
                "paperId": replacement,
                "sections": json!([
                    {
                        "label": "Section A",
                        "totalMarks": 10.0,
                        "questions": [{ "qNo": "Q1", "text": "Define X", "marks": 10.0 }]
                    }
                ])
            }),
        ),
        "editSections",
    );
    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "10",
            "papers.submitToCoe",
            json!({ "caller": caller(&setter, "Staff"), "paperId": replacement }),
        ),
        "submitToCoe",
    );
    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "11",
            "papers.approve",
            json!({ "caller": caller(&coe, "COE"), "paperId": replacement }),
        ),
        "approve",
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "12",
        "papers.delete",
        json!({ "caller": caller(&coe, "COE"), "paperId": replacement }),
    );
    assert_eq!(error_code(&resp), "state_conflict");

    // Still there.
    let fetched = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "13",
            "papers.open",
            json!({ "paperId": replacement }),
        ),
        "papers.open",
    );
    assert_eq!(fetched["status"], "ApprovedLocked");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
