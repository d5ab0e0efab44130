use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hostwatch::lifecycle::{HookResult, LifecycleError, LifecycleManager, LifecycleState, StopSignal};

type Calls = Arc<Mutex<Vec<String>>>;

type Hook = Box<dyn Fn() -> HookResult + Send + Sync>;

fn record(calls: &Calls, label: &str) -> Hook {
    let calls = Arc::clone(calls);
    let label = label.to_string();
    Box::new(move || -> HookResult {
        calls.lock().unwrap().push(label.clone());
        Ok(())
    })
}

fn recorded(calls: &Calls) -> Vec<String> {
    calls.lock().unwrap().clone()
}

#[test]
fn startup_runs_in_ascending_priority() {
    let calls = Calls::default();
    let manager = LifecycleManager::new();
    manager.register_startup(30, record(&calls, "30"));
    manager.register_startup(10, record(&calls, "10"));
    manager.register_startup(20, record(&calls, "20"));

    manager.run_startup().unwrap();

    assert_eq!(recorded(&calls), vec!["10", "20", "30"]);
}

#[test]
fn equal_priorities_run_in_registration_order() {
    let calls = Calls::default();
    let manager = LifecycleManager::new();
    manager.register_shutdown(10, record(&calls, "A"));
    manager.register_shutdown(10, record(&calls, "B"));
    manager.register_shutdown(5, record(&calls, "first"));

    assert!(manager.run_shutdown().is_empty());

    assert_eq!(recorded(&calls), vec!["first", "A", "B"]);
}

#[test]
fn failing_startup_hook_aborts_the_rest() {
    let calls = Calls::default();
    let manager = LifecycleManager::new();
    manager.register_startup(10, || Err("database unavailable".into()));
    manager.register_startup(20, record(&calls, "second"));

    let err = manager.run_startup().unwrap_err();

    assert!(recorded(&calls).is_empty());
    match err {
        LifecycleError::Startup { priority, source } => {
            assert_eq!(priority, 10);
            assert_eq!(source.to_string(), "database unavailable");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn failing_shutdown_hook_does_not_stop_the_others() {
    let calls = Calls::default();
    let manager = LifecycleManager::new();
    manager.register_shutdown(10, record(&calls, "first"));
    manager.register_shutdown(20, || Err("flush failed".into()));
    manager.register_shutdown(30, record(&calls, "third"));

    let failures = manager.run_shutdown();

    assert_eq!(recorded(&calls), vec!["first", "third"]);
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0],
        LifecycleError::Shutdown { priority: 20, source } if source.to_string() == "flush failed"
    ));
    assert_eq!(manager.state(), LifecycleState::Stopped);
}

#[test]
fn flag_is_set_only_between_startup_and_shutdown() {
    let flag = Arc::new(AtomicBool::new(false));
    let manager = LifecycleManager::new();

    let on = Arc::clone(&flag);
    manager.register_startup(50, move || {
        on.store(true, Ordering::SeqCst);
        Ok(())
    });
    let off = Arc::clone(&flag);
    manager.register_shutdown(50, move || {
        off.store(false, Ordering::SeqCst);
        Ok(())
    });

    assert!(!flag.load(Ordering::SeqCst));
    manager.run_startup().unwrap();
    assert!(flag.load(Ordering::SeqCst));
    assert!(manager.run_shutdown().is_empty());
    assert!(!flag.load(Ordering::SeqCst));
}

#[test]
fn registration_is_safe_from_many_threads() {
    let manager = Arc::new(LifecycleManager::new());
    let calls = Calls::default();

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let hook = record(&calls, &format!("hook-{i}"));
            thread::spawn(move || manager.register_startup(i, hook))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    manager.run_startup().unwrap();
    let expected: Vec<String> = (0..8).map(|i| format!("hook-{i}")).collect();
    assert_eq!(recorded(&calls), expected);
}

#[test]
fn main_loop_runs_shutdown_once_stopped() {
    let calls = Calls::default();
    let manager = Arc::new(LifecycleManager::new());
    manager.register_startup(10, record(&calls, "startup"));
    manager.register_shutdown(10, record(&calls, "shutdown"));

    let stop: StopSignal = manager.stop_signal();
    let looping = Arc::clone(&manager);
    let host = thread::spawn(move || looping.run_main_loop(Duration::from_millis(10)));

    // wait for the startup hook before asking to stop
    while recorded(&calls).is_empty() {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!host.is_finished());
    stop.set();

    host.join().unwrap().unwrap();
    assert_eq!(recorded(&calls), vec!["startup", "shutdown"]);
    assert_eq!(manager.state(), LifecycleState::Stopped);
}

#[test]
fn main_loop_skips_shutdown_when_startup_fails() {
    let calls = Calls::default();
    let manager = LifecycleManager::new();
    manager.register_startup(10, || Err("bad config".into()));
    manager.register_shutdown(10, record(&calls, "shutdown"));

    assert!(manager.run_main_loop(Duration::from_millis(10)).is_err());
    assert!(recorded(&calls).is_empty());
}
