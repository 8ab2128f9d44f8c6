//! Architecture rules for the widget core and the terminal surface

use std::fs;

use architectural_enforcement::{assert_clean, find_violations, workspace_root};

/// Modules that own background tasks
const SPAWN_OWNERS: &[&str] = &[
    "widget/core/src/scheduler.rs",
    "widget/core/src/widget.rs",
    "widget/core/src/transport/listener.rs",
    "widget/core/src/transport/scripted.rs",
];

/// Modules that own timers
const TIMER_OWNERS: &[&str] = &[
    "widget/core/src/scheduler.rs",
    "widget/core/src/transport/listener.rs",
    "widget/core/src/transport/scripted.rs",
    "tui/src/app.rs",
];

#[test]
fn test_no_blocking_sleep() {
    let violations = find_violations(&workspace_root(), &["thread::sleep"], &[]);
    assert_clean("blocking sleep in async code", &violations);
}

#[test]
fn test_timers_only_in_owners() {
    let violations = find_violations(
        &workspace_root(),
        &["sleep(", "sleep_until(", "interval(", "interval_at("],
        TIMER_OWNERS,
    );
    assert_clean("timer outside scheduler/listener/frame loop", &violations);
}

#[test]
fn test_spawn_only_in_owners() {
    let violations = find_violations(
        &workspace_root(),
        &["tokio::spawn", "thread::spawn", "spawn_blocking"],
        SPAWN_OWNERS,
    );
    assert_clean("task spawned outside its owner", &violations);
}

#[test]
fn test_no_global_mutable_state() {
    let violations = find_violations(
        &workspace_root(),
        &["static mut", "lazy_static!", "OnceLock<", "OnceCell<"],
        &[],
    );
    assert_clean("global mutable state", &violations);
}

#[test]
fn test_core_has_no_ui_dependencies() {
    let root = workspace_root();
    let manifest = fs::read_to_string(root.join("widget/core/Cargo.toml")).unwrap();
    for ui_crate in ["ratatui", "crossterm"] {
        assert!(
            !manifest.contains(ui_crate),
            "widget core depends on {ui_crate}"
        );
    }

    let violations = find_violations(&root, &["ratatui::", "crossterm::"], &[])
        .into_iter()
        .filter(|v| v.file.starts_with("widget/core/"))
        .collect::<Vec<_>>();
    assert_clean("UI types in the widget core", &violations);
}

#[test]
fn test_no_unwrap_in_production() {
    let violations = find_violations(&workspace_root(), &[".unwrap()", ".expect("], &[]);
    assert_clean("unwrap/expect outside tests", &violations);
}

/// Startup code that may block before the runtime is busy
const STARTUP_IO: &[&str] = &["widget/core/src/config.rs", "tui/src/main.rs"];

#[test]
fn test_no_blocking_io_after_startup() {
    let violations = find_violations(
        &workspace_root(),
        &["std::fs::", "use std::fs", "std::net::", "reqwest::blocking"],
        STARTUP_IO,
    );
    assert_clean("blocking I/O in async code", &violations);
}
