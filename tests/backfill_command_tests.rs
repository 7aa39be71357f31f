use credentials_dispatch::commands::enqueue_backfill;
use credentials_dispatch::config::ConfigManager;
use credentials_dispatch::messaging::{
    submitter_from_config, SpoolFileQueue, TaskName, WorkItem,
};
use std::path::Path;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_update-credentials-available-date");

fn write_spool_config(dir: &Path, spool: &Path) -> std::path::PathBuf {
    let config_path = dir.join("credentials-dispatch.toml");
    std::fs::write(
        &config_path,
        format!(
            "[queue]\nbackend = \"spool\"\nspool_path = {:?}\n",
            spool.display().to_string()
        ),
    )
    .unwrap();
    config_path
}

/// The binary with no environment overrides, run from `dir`
fn command_in(dir: &Path) -> Command {
    let mut command = Command::new(BIN);
    command.current_dir(dir);
    for (key, _) in std::env::vars() {
        if key.starts_with("CREDENTIALS_DISPATCH") || key == "RUST_LOG" {
            command.env_remove(key);
        }
    }
    command
}

fn spooled_items(spool: &Path) -> Vec<WorkItem> {
    std::fs::read_to_string(spool)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_enqueue_backfill_into_spool() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool.jsonl");
    let queue = SpoolFileQueue::new(&spool);

    let item = enqueue_backfill(&queue).await.unwrap();

    assert_eq!(spooled_items(&spool), vec![item]);
}

#[tokio::test]
async fn test_enqueue_backfill_from_loaded_config() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool.jsonl");
    let config_path = write_spool_config(dir.path(), &spool);

    let manager = ConfigManager::load_from_path(Some(&config_path)).unwrap();
    let submitter = submitter_from_config(&manager.config().queue).unwrap();
    enqueue_backfill(submitter.as_ref()).await.unwrap();
    enqueue_backfill(submitter.as_ref()).await.unwrap();

    let items = spooled_items(&spool);
    assert_eq!(items.len(), 2);
    // every run is distinct
    assert_ne!(items[0].idempotency_key, items[1].idempotency_key);
}

#[test]
fn test_binary_enqueues_one_backfill_task() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool.jsonl");
    let config_path = write_spool_config(dir.path(), &spool);

    let status = Command::new(BIN)
        .arg("--config")
        .arg(&config_path)
        .status()
        .unwrap();

    assert!(status.success());
    let items = spooled_items(&spool);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].task_name, TaskName::BackfillDateForAllCourseRuns);
    assert!(items[0].args.is_empty());
}

#[test]
fn test_binary_fails_on_missing_config() {
    let dir = tempfile::tempdir().unwrap();

    let status = Command::new(BIN)
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_binary_without_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = command_in(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("queue.spool_path"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_binary_refuses_in_memory_queue() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("credentials-dispatch.toml");
    std::fs::write(&config_path, "[queue]\nbackend = \"in_memory\"\n").unwrap();

    let output = command_in(dir.path())
        .arg("--config")
        .arg(&config_path)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("spool backend"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_json_logs_stay_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool.jsonl");
    let config_path = write_spool_config(dir.path(), &spool);

    let output = command_in(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--json-logs")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("backfill_date_for_all_course_runs"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("\"level\""));
}

#[test]
fn test_config_failure_is_logged() {
    let dir = tempfile::tempdir().unwrap();

    let output = command_in(dir.path())
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--json-logs")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr
        .lines()
        .any(|line| line.contains("\"ERROR\"") && line.contains("enqueue_backfill")));
}

#[test]
fn test_binary_fails_when_spool_unwritable() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("missing-dir").join("spool.jsonl");
    let config_path = write_spool_config(dir.path(), &spool);

    let status = Command::new(BIN)
        .arg("--config")
        .arg(&config_path)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!spool.exists());
}

#[tokio::test]
async fn test_concurrent_spool_writes_keep_lines_intact() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool.jsonl");
    let queue = SpoolFileQueue::new(&spool);

    let results = futures::future::join_all((0..16).map(|_| enqueue_backfill(&queue))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let items = spooled_items(&spool);
    assert_eq!(items.len(), 16);
    assert!(items
        .iter()
        .all(|i| i.task_name == TaskName::BackfillDateForAllCourseRuns));
}
