// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_show_output() {
    let stdout = "ActiveState=active\nSubState=running\nMainPID=1234\nExecMainStatus=0\n";
    let props = parse_show_output(stdout);
    assert_eq!(props.active_state, "active");
    assert_eq!(props.sub_state, "running");
    assert_eq!(props.main_pid, Some(1234));
    assert_eq!(props.exec_main_status, Some(0));
}

#[test]
fn zero_pid_means_no_main_process() {
    let props = parse_show_output("ActiveState=inactive\nSubState=dead\nMainPID=0\n");
    assert_eq!(props.main_pid, None);
}

#[test]
fn ignores_unknown_properties_and_garbage() {
    let props = parse_show_output("Foo=bar\nnot a property line\nActiveState=failed\n");
    assert_eq!(props.active_state, "failed");
    assert_eq!(props.sub_state, "");
}

#[yare::parameterized(
    running      = { "active", "running", ProcessState::Running },
    active_other = { "active", "exited", ProcessState::Starting },
    activating   = { "activating", "start", ProcessState::Starting },
    deactivating = { "deactivating", "stop", ProcessState::Stopping },
    inactive     = { "inactive", "dead", ProcessState::Stopped },
    failed       = { "failed", "failed", ProcessState::Failed },
    unknown      = { "reloading", "reload", ProcessState::Unknown },
)]
fn maps_systemd_states(active: &str, sub: &str, expected: ProcessState) {
    assert_eq!(ProcessState::from_systemd(active, sub), expected);
}
