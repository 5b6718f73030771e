// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn manager(dir: &Path) -> DirectManager {
    DirectManager::new(&dir.join("pids"), &dir.join("logs")).unwrap()
}

fn shell(name: &str, script: &str) -> ProcessConfig {
    let mut config = ProcessConfig::new(name, "/bin/sh");
    config.args = vec!["-c".to_string(), script.to_string()];
    config
}

async fn wait_for_exit(manager: &DirectManager, name: &str) -> ProcessStatus {
    for _ in 0..100 {
        let status = manager.status(name).await.unwrap();
        if status.pid.is_none() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    manager.status(name).await.unwrap()
}

#[tokio::test]
async fn start_writes_pid_file_and_runs() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("sleeper", "sleep 30")).await.unwrap();

    let status = m.status("sleeper").await.unwrap();
    assert_eq!(status.state, ProcessState::Running);
    let pid = status.pid.unwrap();

    let pid_file = dir.path().join("pids/sleeper.pid");
    let content = std::fs::read_to_string(&pid_file).unwrap();
    assert_eq!(content.trim().parse::<u32>().unwrap(), pid);

    m.kill("sleeper").await.unwrap();
    wait_for_exit(&m, "sleeper").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pid_file.exists(), "pid file removed on exit");
}

#[tokio::test]
async fn clean_exit_is_stopped_failure_is_failed() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("ok", "exit 0")).await.unwrap();
    let status = wait_for_exit(&m, "ok").await;
    assert_eq!(status.state, ProcessState::Stopped);
    assert_eq!(status.exit_code, Some(0));

    m.start(&shell("bad", "exit 3")).await.unwrap();
    let status = wait_for_exit(&m, "bad").await;
    assert_eq!(status.state, ProcessState::Failed);
    assert_eq!(status.exit_code, Some(3));
}

#[tokio::test]
async fn captures_output_with_stream_labels() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    let config = shell("chatty", "echo out-line; echo err-line 1>&2")
        .capture_output(true);
    m.start(&config).await.unwrap();
    wait_for_exit(&m, "chatty").await;
    // Reader tasks may lag the exit by a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let lines = m.output("chatty", 10).await.unwrap();
    assert!(lines.iter().any(|l| l.contains("stdout: out-line")), "{lines:?}");
    assert!(lines.iter().any(|l| l.contains("stderr: err-line")), "{lines:?}");

    let log_path = dir.path().join("logs/chatty.log");
    let logged = std::fs::read_to_string(&log_path).unwrap();
    assert!(logged.contains("out-line"));
}

#[tokio::test]
async fn on_failure_policy_restarts_up_to_budget() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    let config = shell("flappy", "exit 1")
        .restart_policy(RestartPolicy::OnFailure)
        .max_restarts(2)
        .restart_delay(Duration::from_millis(50));
    m.start(&config).await.unwrap();

    // Two automatic restarts, then terminal.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let status = m.status("flappy").await.unwrap();
    assert_eq!(status.restart_count, 2);
    assert_eq!(status.state, ProcessState::Failed);
}

#[tokio::test]
async fn default_budget_applies_when_config_has_none() {
    let dir = tempdir().unwrap();
    let m = DirectManager::with_default_max_restarts(
        &dir.path().join("pids"),
        &dir.path().join("logs"),
        1,
    )
    .unwrap();

    let config = shell("budgetless", "exit 1")
        .restart_policy(RestartPolicy::OnFailure)
        .restart_delay(Duration::from_millis(50));
    m.start(&config).await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = m.status("budgetless").await.unwrap();
    assert_eq!(status.restart_count, 1);
}

#[tokio::test]
async fn never_policy_stays_down() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("once", "exit 1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = m.status("once").await.unwrap();
    assert_eq!(status.restart_count, 0);
}

#[tokio::test]
async fn stop_terminates_gracefully() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("stoppable", "sleep 30")).await.unwrap();
    m.stop("stoppable").await.unwrap();

    let status = wait_for_exit(&m, "stoppable").await;
    assert!(status.pid.is_none());
}

#[tokio::test]
async fn restart_spawns_a_fresh_process() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("phoenix", "sleep 30")).await.unwrap();
    let first_pid = m.status("phoenix").await.unwrap().pid.unwrap();

    m.restart("phoenix").await.unwrap();
    let second_pid = m.status("phoenix").await.unwrap().pid.unwrap();
    assert_ne!(first_pid, second_pid);

    m.close().await.unwrap();
}

#[tokio::test]
async fn unknown_process_is_not_found() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());
    assert!(matches!(
        m.status("ghost").await,
        Err(ProcessError::NotFound(_))
    ));
}

#[tokio::test]
async fn list_reports_every_process_sorted() {
    let dir = tempdir().unwrap();
    let m = manager(dir.path());

    m.start(&shell("b-proc", "sleep 30")).await.unwrap();
    m.start(&shell("a-proc", "sleep 30")).await.unwrap();

    let list = m.list().await.unwrap();
    let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a-proc", "b-proc"]);

    m.close().await.unwrap();
}
