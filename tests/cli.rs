use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn realm_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("realm");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[server]
url = "http://127.0.0.1:9"
timeout_secs = 1

[blobs]
api_url = "http://127.0.0.1:9"
timeout_secs = 1

[cache]
path = "{}/data/realm.sqlite"
max_entries = 16

[feeds]
page_size = 5
"#,
        root.display()
    );

    let config_path = root.join("realm.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_realm(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_realm_with_stdin(config_path, args, None)
}

fn run_realm_with_stdin(
    config_path: &Path,
    args: &[&str],
    stdin: Option<&str>,
) -> (String, String, bool) {
    let binary = realm_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run realm binary at {:?}: {}", binary, e));

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_cache_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_realm(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/realm.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_realm(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_realm(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_summarize_file_with_title() {
    let (tmp, config_path) = setup_test_env();
    let note = tmp.path().join("note.md");
    fs::write(&note, "---\ndraft: true\n---\n# Trip Report\n![](a.jpg)\nBody").unwrap();

    let (stdout, stderr, success) =
        run_realm(&config_path, &["summarize", note.to_str().unwrap()]);
    assert!(success, "summarize failed: {}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["summary"], "Trip Report");
    assert_eq!(json["images"], serde_json::json!(["a.jpg"]));
}

#[test]
fn test_summarize_stdin_truncates() {
    let (_tmp, config_path) = setup_test_env();
    let input = "a".repeat(100);

    let (stdout, stderr, success) =
        run_realm_with_stdin(&config_path, &["summarize", "-"], Some(&input));
    assert!(success, "summarize failed: {}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["summary"], format!("{}...", "a".repeat(64)));
}

#[test]
fn test_offline_commands_need_no_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("absent.toml");

    let (stdout, stderr, success) = run_realm(&missing, &["tag", "Hello, World!", "HELLO WORLD"]);
    assert!(success, "tag failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["Hello, World!\thelloworld", "HELLO WORLD\thelloworld"]);
}

#[test]
fn test_color_is_deterministic_hex() {
    let (_tmp, config_path) = setup_test_env();

    let (first, _, success) = run_realm(&config_path, &["color", "Rust", "Go"]);
    assert!(success);
    let (second, _, _) = run_realm(&config_path, &["color", "Rust", "Go"]);
    assert_eq!(first, second);

    for line in first.lines() {
        let (_, color) = line.split_once('\t').unwrap();
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
        assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn test_user_notes_requires_owner() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_realm(&config_path, &["feed", "user-notes"]);
    assert!(!success);
    assert!(stderr.contains("--owner"));
}

#[test]
fn test_publish_empty_note_fails_before_network() {
    let (tmp, config_path) = setup_test_env();
    let note = tmp.path().join("empty.md");
    fs::write(&note, "  \n").unwrap();

    let (_, stderr, success) = run_realm(
        &config_path,
        &["publish", note.to_str().unwrap(), "--signer", "0xabc"],
    );
    assert!(!success);
    assert!(stderr.contains("Note is empty"), "stderr={}", stderr);
}

#[test]
fn test_unreachable_feed_reports_failure() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_realm(&config_path, &["feed", "notes"]);
    assert!(!success);
    assert!(stderr.contains("notes feed"), "stderr={}", stderr);
}

#[test]
fn test_lookups_fail_cleanly_when_unreachable() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_realm(&config_path, &["tags", "--owner", "0xabc"]);
    assert!(!success);
    assert!(stdout.is_empty());

    let (stdout, _, success) = run_realm(&config_path, &["proposal", "p1", "--voter", "0xabc"]);
    assert!(!success);
    assert!(stdout.is_empty());
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("realm.toml");
    fs::write(&config_path, "[server]\nurl = \"http://x\"\n[feeds]\npage_size = 0\n").unwrap();

    let (_, stderr, success) = run_realm(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("page_size"));
}
