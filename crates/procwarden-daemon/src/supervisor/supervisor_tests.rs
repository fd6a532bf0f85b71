#![cfg(unix)]

use std::time::Duration;

use super::*;
use crate::types::{ExitCause, SIGKILL};

fn supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(SupervisorConfig::default())
}

#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // The state follows the parenthesised command name.
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.trim_start().chars().next()
}

#[cfg(target_os = "linux")]
async fn wait_for_state(pid: u32, wanted: impl Fn(char) -> bool) -> bool {
    for _ in 0..100 {
        if proc_state(pid).map(&wanted).unwrap_or(false) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_spawn_assigns_increasing_ids() {
    let supervisor = supervisor();
    let first = supervisor.spawn("true", None).unwrap();
    let second = supervisor.spawn("true", None).unwrap();

    assert!(second.handle.id() > first.handle.id());
    assert_eq!(first.watch.process_id(), first.handle.id());

    first.watch.await_exit().await;
    second.watch.await_exit().await;
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn test_natural_exit_codes() {
    let supervisor = supervisor();

    let ok = supervisor.spawn("true", None).unwrap();
    assert_eq!(ok.watch.await_exit().await.cause, ExitCause::Code { code: 0 });

    let failed = supervisor.spawn("false", None).unwrap();
    assert_eq!(failed.watch.await_exit().await.cause, ExitCause::Code { code: 1 });
}

#[tokio::test]
async fn test_spawn_missing_executable() {
    let supervisor = supervisor();
    let err = supervisor
        .spawn("/nonexistent/procwarden-test-binary --flag", None)
        .err()
        .unwrap();

    match err {
        DaemonError::Spawn { command, .. } => {
            assert!(command.contains("procwarden-test-binary"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn test_spawn_bad_working_directory() {
    let supervisor = supervisor();
    let result = supervisor.spawn("true", Some(Path::new("/nonexistent_directory_xyz")));
    assert!(matches!(result, Err(DaemonError::Spawn { .. })));
}

#[tokio::test]
async fn test_spawn_blank_command() {
    let supervisor = supervisor();
    let result = supervisor.spawn("   ", None);
    assert!(matches!(result, Err(DaemonError::Spawn { .. })));
}

#[tokio::test]
async fn test_spawn_in_working_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let supervisor = supervisor();

    let spawned = supervisor
        .spawn("touch created-here", Some(dir.path()))
        .unwrap();
    assert_eq!(spawned.watch.await_exit().await.cause, ExitCause::Code { code: 0 });
    assert!(dir.path().join("created-here").exists());
}

#[tokio::test]
async fn test_terminate_reports_kill_signal() {
    let supervisor = supervisor();
    let spawned = supervisor.spawn("sleep 30", None).unwrap();
    let handle = spawned.handle.clone();
    let watch = tokio::spawn(spawned.watch.await_exit());

    assert!(supervisor.is_live(&handle));
    supervisor.terminate(&handle).await.unwrap();

    let exit = tokio::time::timeout(Duration::from_secs(5), watch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit.cause, ExitCause::Signal { signal: SIGKILL });
    assert!(!supervisor.is_live(&handle));
}

#[tokio::test]
async fn test_terminate_is_idempotent() {
    let supervisor = supervisor();
    let spawned = supervisor.spawn("true", None).unwrap();
    let handle = spawned.handle.clone();
    spawned.watch.await_exit().await;

    assert!(supervisor.terminate(&handle).await.is_ok());
    assert!(supervisor.terminate(&handle).await.is_ok());
}

#[tokio::test]
async fn test_pause_after_exit_is_signal_error() {
    let supervisor = supervisor();
    let spawned = supervisor.spawn("true", None).unwrap();
    let handle = spawned.handle.clone();
    spawned.watch.await_exit().await;

    let err = supervisor.pause(&handle).await.unwrap_err();
    assert!(matches!(err, DaemonError::Signal { pid, .. } if pid == handle.pid()));
    assert!(supervisor.resume(&handle).await.is_err());
}

#[tokio::test]
async fn test_pause_and_resume() {
    let supervisor = supervisor();
    let spawned = supervisor.spawn("sleep 30", None).unwrap();
    let handle = spawned.handle.clone();
    let watch = tokio::spawn(spawned.watch.await_exit());

    supervisor.pause(&handle).await.unwrap();
    #[cfg(target_os = "linux")]
    assert!(wait_for_state(handle.pid(), |s| s == 'T').await);

    supervisor.resume(&handle).await.unwrap();
    #[cfg(target_os = "linux")]
    assert!(wait_for_state(handle.pid(), |s| s != 'T').await);

    // Still resident after a pause/resume cycle.
    assert!(supervisor.is_live(&handle));

    supervisor.terminate(&handle).await.unwrap();
    watch.await.unwrap();
}

#[tokio::test]
async fn test_terminate_paused_process() {
    let supervisor = supervisor();
    let spawned = supervisor.spawn("sleep 30", None).unwrap();
    let handle = spawned.handle.clone();
    let watch = tokio::spawn(spawned.watch.await_exit());

    supervisor.pause(&handle).await.unwrap();
    supervisor.terminate(&handle).await.unwrap();

    let exit = tokio::time::timeout(Duration::from_secs(5), watch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit.cause, ExitCause::Signal { signal: SIGKILL });
}

#[tokio::test]
async fn test_shell_mode() {
    let supervisor = ProcessSupervisor::new(SupervisorConfig {
        use_shell: true,
        shell: "/bin/sh".to_string(),
    });

    let spawned = supervisor.spawn("exit 7", None).unwrap();
    assert_eq!(spawned.watch.await_exit().await.cause, ExitCause::Code { code: 7 });
}

#[tokio::test]
async fn test_shell_mode_terminates_whole_group() {
    let supervisor = ProcessSupervisor::new(SupervisorConfig {
        use_shell: true,
        shell: "/bin/sh".to_string(),
    });

    let spawned = supervisor.spawn("sleep 30; echo done", None).unwrap();
    let handle = spawned.handle.clone();
    let watch = tokio::spawn(spawned.watch.await_exit());

    supervisor.terminate(&handle).await.unwrap();
    let exit = tokio::time::timeout(Duration::from_secs(5), watch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit.cause, ExitCause::Signal { signal: SIGKILL });
}

#[test]
fn test_process_id_display() {
    assert_eq!(ProcessId(7).to_string(), "#7");
}
