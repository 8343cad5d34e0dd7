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

fn caller(user_id: &str, role: &str) -> Value {
    json!({ "userId": user_id, "role": role, "department": "CS" })
}

struct Seed {
    coe: String,
    setter: String,
    scrutineer: String,
    paper_id: String,
}

/// Workspace with one paper assigned to `setter` for subject CS301/SEE.
fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &PathBuf) -> Seed {
    let _ = expect_ok(
        &request(
            stdin,
            reader,
            "s1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        ),
        "workspace.select",
    );
    let mk_staff = |stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, id: &str, name: &str, role: &str| {
        expect_ok(
            &request(
                stdin,
                reader,
                id,
                "staff.create",
                json!({
                    "caller": caller("bootstrap", "Admin"),
                    "name": name,
                    "role": role,
                    "department": "CS"
                }),
            ),
            "staff.create",
        )["staffId"]
            .as_str()
            .expect("staffId")
            .to_string()
    };
    let coe = mk_staff(stdin, reader, "s2", "Controller", "COE");
    let setter = mk_staff(stdin, reader, "s3", "Setter One", "Staff");
    let scrutineer = mk_staff(stdin, reader, "s4", "Scrutineer", "HOD");
    let subject = expect_ok(
        &request(
            stdin,
            reader,
            "s5",
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
    let paper_id = expect_ok(
        &request(
            stdin,
            reader,
            "s6",
            "papers.assign",
            json!({
                "caller": caller(&coe, "COE"),
                "subjectId": subject,
                "examType": "SEE",
                "setterId": setter
            }),
        ),
        "papers.assign",
    )["id"]
        .as_str()
        .expect("paper id")
        .to_string();
    Seed {
        coe,
        setter,
        scrutineer,
        paper_id,
    }
}

fn sample_sections() -> Value {
    json!([
        {
            "label": "Section A",
            "totalMarks": 10.0,
            "questions": [{ "qNo": "Q3", "text": "State the theorem", "marks": 10.0 }]
        }
    ])
}

#[test]
fn send_back_loops_through_corrections_and_resubmission() {
    let workspace = temp_dir("qpflow-corrections");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let seed = seed(&mut stdin, &mut reader, &workspace);

    // Drive to UnderScrutiny.
    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "1",
            "papers.editSections",
            json!({
                "caller": caller(&seed.setter, "Staff"),
                "paperId": seed.paper_id,
                "sections": sample_sections()
            }),
        ),
        "editSections",
    );
    let _ = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "2",
            "papers.submitToCoe",
            json!({ "caller": caller(&seed.setter, "Staff"), "paperId": seed.paper_id }),
        ),
        "submitToCoe",
    );
    let routed = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "3",
            "papers.sendToScrutiny",
            json!({
                "caller": caller(&seed.coe, "COE"),
                "paperId": seed.paper_id,
                "scrutinyStaffId": seed.scrutineer
            }),
        ),
        "sendToScrutiny",
    );
    assert_eq!(routed["status"], "UnderScrutiny");

    // Bounce it back with a reason.
    let bounced = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "4",
            "papers.sendBack",
            json!({
                "caller": caller(&seed.coe, "COE"),
                "paperId": seed.paper_id,
                "note": "fix Q3"
            }),
        ),
        "sendBack",
    );
    assert_eq!(bounced["status"], "CorrectionsRequested");
    let last = bounced["history"].as_array().expect("history").last().cloned().expect("entry");
    assert_eq!(last["action"], "CorrectionsRequested");
    assert_eq!(last["note"], "fix Q3");

    // Editing during a correction round keeps the paper in
    // CorrectionsRequested; only a fresh first edit produces Draft.
    let re_edited = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "5",
            "papers.editSections",
            json!({
                "caller": caller(&seed.setter, "Staff"),
                "paperId": seed.paper_id,
                "sections": sample_sections()
            }),
        ),
        "re-edit",
    );
    assert_eq!(re_edited["status"], "CorrectionsRequested");

    let resubmitted = expect_ok(
        &request(
            &mut stdin,
            &mut reader,
            "6",
            "papers.submitToCoe",
            json!({ "caller": caller(&seed.setter, "Staff"), "paperId": seed.paper_id }),
        ),
        "resubmit",
    );
    assert_eq!(resubmitted["status"], "SubmittedToCOE");

    // 7 transitions so far: Assigned, edit, submit, route, send back,
    // edit, submit.
    assert_eq!(resubmitted["history"].as_array().expect("history").len(), 7);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
