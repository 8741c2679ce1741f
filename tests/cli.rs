use std::io::Write;
use std::process::{ Command, Output, Stdio };

fn run_with_stdin(input: &str) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_chat-bridge"))
        .env("DB_PATH", dir.path().join("database.sqlite"))
        .env("INFERENCE_BASE_URL", "http://127.0.0.1:9")
        .env_remove("PROMPTS_PATH")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1, "expected a single line, got {:?}", stdout);
    serde_json::from_str(stdout.trim()).unwrap()
}

#[test]
fn malformed_stdin_exits_with_one() {
    let output = run_with_stdin("{not json");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output), serde_json::json!({"error": "Invalid JSON input"}));
}

#[test]
fn empty_stdin_exits_with_one() {
    let output = run_with_stdin("");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn validation_errors_exit_cleanly() {
    let output = run_with_stdin(r#"{"model_choice": "llama", "query": "Hi"}"#);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "error": "JSON input must contain 'model_choice', 'query', and 'conversation_id' fields."
        })
    );
}

#[test]
fn unknown_model_exits_cleanly() {
    let output = run_with_stdin(r#"{"model_choice": "phi", "query": "Hi", "conversation_id": 1}"#);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({"error": "Invalid model choice. Please choose llama or mistral."})
    );
}

#[test]
fn unreachable_inference_server_is_reported_as_json() {
    let output = run_with_stdin(r#"{"model_choice": "llama", "query": "Hi", "conversation_id": 1}"#);
    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    assert!(value["error"].as_str().unwrap().starts_with("An unexpected error occurred: "));
}

fn seeded_db(dir: &std::path::Path) -> std::path::PathBuf {
    let db_path = dir.join("database.sqlite");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER,
            user_content TEXT,
            ai_content TEXT,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        INSERT INTO messages (conversation_id, user_content, ai_content, timestamp) VALUES
            (1, 'first', 'one', '2024-01-01 10:00:01'),
            (2, 'other', 'two', '2024-01-01 10:00:02'),
            (1, 'second', 'three', '2024-01-01 10:00:03');"
    ).unwrap();
    db_path
}

fn run_history_command(db_path: &std::path::Path, command: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chat-bridge"))
        .env("DB_PATH", db_path)
        .env("RUST_LOG", "off")
        .args(command)
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn recent_lists_newest_messages_first() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seeded_db(dir.path());

    let output = run_history_command(&db_path, &["recent", "--limit", "2"]);
    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["user_content"], "second");
    assert_eq!(rows[0]["conversation_id"], 1);
    assert_eq!(rows[1]["user_content"], "other");
}

#[test]
fn show_lists_one_conversation_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seeded_db(dir.path());

    let output = run_history_command(&db_path, &["show", "1"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!([
            {"user_content": "first", "ai_content": "one", "timestamp": "2024-01-01 10:00:01"},
            {"user_content": "second", "ai_content": "three", "timestamp": "2024-01-01 10:00:03"}
        ])
    );
}

#[test]
fn history_commands_report_a_missing_database() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_history_command(&dir.path().join("absent.sqlite"), &["recent"]);
    assert_eq!(output.status.code(), Some(1));
    let value = stdout_json(&output);
    assert!(value["error"].as_str().unwrap().starts_with("An unexpected error occurred: "));
}
