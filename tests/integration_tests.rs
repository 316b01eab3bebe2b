//! Integration tests for proc-command
//!
//! Each test drives real child processes through the `PollLoop` host.

use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use proc_command::execution::EXIT_STATUS_UNKNOWN;
use proc_command::{
    Atom, Command, Emission, Message, Outlet, Phase, PollLoop, Supervisor, SupervisorConfig,
};
use std::sync::Mutex;
use std::time::Duration;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const TIMEOUT: Duration = Duration::from_secs(10);

fn sh(script: &str) -> Vec<Atom> {
    vec![Atom::symbol("sh"), Atom::symbol("-c"), Atom::symbol(script)]
}

fn on(events: &[Emission], outlet: Outlet) -> Vec<Message> {
    events
        .iter()
        .filter(|e| e.outlet == outlet)
        .map(|e| e.message.clone())
        .collect()
}

fn tagged(selector: &str, args: Vec<Atom>) -> Message {
    Message::Anything {
        selector: selector.to_string(),
        args,
    }
}

/// Text output is split into records and typed
#[test]
fn test_text_records_reach_stdout() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("printf '42\\nfoo 1 2\\n1 2 3\\n'"))
        .unwrap();
    let status = host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    assert_eq!(status, Some(0));
    let events = host.take_events();
    assert_eq!(
        on(&events, Outlet::Stdout),
        vec![
            Message::Float(42.0),
            tagged("foo", vec![Atom::Float(1.0), Atom::Float(2.0)]),
            Message::List(vec![Atom::Float(1.0), Atom::Float(2.0), Atom::Float(3.0)]),
        ]
    );
    assert!(host.is_idle());
}

/// A record with a substitution marker is dropped, later records survive
#[test]
fn test_dollar_record_is_skipped() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("printf 'a $1\\nb 2\\n'"))
        .unwrap();
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    assert_eq!(
        on(&host.take_events(), Outlet::Stdout),
        vec![tagged("b", vec![Atom::Float(2.0)])]
    );
}

/// Exit status is emitted exactly once, after the output
#[test]
fn test_exit_status_emitted_once() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("echo bye; exit 7"))
        .unwrap();
    assert_eq!(
        host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
        Some(7)
    );

    // Further turns produce nothing.
    host.turn(&mut supervisor, Duration::from_millis(20)).unwrap();
    let events = host.take_events();
    assert_eq!(on(&events, Outlet::Done), vec![Message::Float(7.0)]);
    assert_eq!(events.last().map(|e| e.outlet), Some(Outlet::Done));
}

/// Stderr lines go to the stderr outlet only
#[test]
fn test_stderr_is_separate() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("echo out; echo err 5 >&2"))
        .unwrap();
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    let events = host.take_events();
    assert_eq!(on(&events, Outlet::Stdout), vec![tagged("out", vec![])]);
    assert_eq!(
        on(&events, Outlet::Stderr),
        vec![tagged("err", vec![Atom::Float(5.0)])]
    );
}

/// Binary mode from creation flags delivers byte values
#[test]
fn test_binary_flag_from_creation_args() {
    let config = SupervisorConfig::from_creation_args(&[Atom::symbol("-b")]);
    let mut supervisor = Supervisor::new(config);
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("printf 'AB\\n'"))
        .unwrap();
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    let bytes: Vec<Atom> = on(&host.take_events(), Outlet::Stdout)
        .into_iter()
        .flat_map(|m| match m {
            Message::List(atoms) => atoms,
            other => panic!("expected a byte list, got {other:?}"),
        })
        .collect();
    assert_eq!(
        bytes,
        vec![Atom::Float(65.0), Atom::Float(66.0), Atom::Float(10.0)]
    );
}

/// Commands parsed from text lines drive the supervisor
#[test]
fn test_command_lines() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    let exec = Command::parse_line("exec printf 42\\n").unwrap();
    supervisor.dispatch(&mut host, &exec);
    assert_eq!(
        host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
        Some(0)
    );
    assert_eq!(
        on(&host.take_events(), Outlet::Stdout),
        vec![Message::Float(42.0)]
    );
}

/// `kill` interrupts the child; abnormal termination reports the unknown status
#[test]
fn test_kill_reports_unknown_status() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor.dispatch(&mut host, &Command::parse_line("exec sleep 5").unwrap());
    assert_eq!(supervisor.phase(), Phase::Running);
    supervisor.dispatch(&mut host, &Command::Kill);
    assert_eq!(supervisor.phase(), Phase::KillRequested);

    assert_eq!(
        host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
        Some(EXIT_STATUS_UNKNOWN)
    );
    assert_eq!(supervisor.phase(), Phase::Idle);
}

/// Fields sent to stdin come back on stdout as one line
#[test]
fn test_send_round_trip() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("l=$(head -c 8); echo \"$l\""))
        .unwrap();
    supervisor
        .dispatch(&mut host, &Command::parse_line("send ping 3.5").unwrap());
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    assert_eq!(
        on(&host.take_events(), Outlet::Stdout),
        vec![tagged("ping", vec![Atom::Float(3.5)])]
    );
}

/// Variables set with `env` are visible to later children
#[test]
fn test_env_reaches_child() {
    let _lock = ENV_LOCK.lock();
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor.dispatch(
        &mut host,
        &Command::parse_line("env PROC_COMMAND_IT_VAR 12").unwrap(),
    );
    supervisor
        .exec(&mut host, &sh("echo $PROC_COMMAND_IT_VAR"))
        .unwrap();
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    assert_eq!(
        on(&host.take_events(), Outlet::Stdout),
        vec![Message::Float(12.0)]
    );
    std::env::remove_var("PROC_COMMAND_IT_VAR");
}

/// A program that cannot be started reports its errno on the done outlet
#[test]
fn test_missing_program_reports_errno() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    assert!(supervisor
        .exec(&mut host, &[Atom::symbol("no-such-program-proc-command")])
        .is_err());
    assert_eq!(
        host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
        Some(libc::ENOENT)
    );
    assert!(host.is_idle());
}

/// One instance runs several children in sequence
#[test]
fn test_sequential_execs() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    for code in [1, 2, 3] {
        supervisor
            .exec(&mut host, &sh(&format!("exit {}", code)))
            .unwrap();
        assert_eq!(
            host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
            Some(code)
        );
    }
}

/// Synchronous mode is complete when `exec` returns
#[test]
fn test_synchronous_exec() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default().synchronous(true));
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &sh("echo ready; exit 2"))
        .unwrap();

    assert!(!supervisor.is_running());
    assert!(host.is_idle());
    let events = host.take_events();
    assert_eq!(on(&events, Outlet::Stdout), vec![tagged("ready", vec![])]);
    assert_eq!(on(&events, Outlet::Done), vec![Message::Float(2.0)]);
}

/// Working directory is applied to the child
#[test]
fn test_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("present.txt"), b"").unwrap();

    let mut supervisor = Supervisor::new(SupervisorConfig::default().working_dir(dir.path()));
    let mut host = PollLoop::new();

    supervisor.exec(&mut host, &sh("ls")).unwrap();
    host.run_until_exit(&mut supervisor, TIMEOUT).unwrap();

    assert_eq!(
        on(&host.take_events(), Outlet::Stdout),
        vec![tagged("present.txt", vec![])]
    );
}

/// Shutdown interrupts the child and leaves nothing registered
#[test]
fn test_shutdown_interrupts_child() {
    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    let mut host = PollLoop::new();

    supervisor
        .exec(&mut host, &[Atom::symbol("sleep"), Atom::Float(5.0)])
        .unwrap();
    let pid = supervisor.pid().unwrap();
    assert_eq!(host.watched_count(), 2);
    assert!(host.timer_armed());

    supervisor.shutdown(&mut host);

    assert!(host.is_idle());
    assert!(host.take_events().is_empty());
    assert!(matches!(
        waitpid(pid, None),
        Ok(WaitStatus::Signaled(_, Signal::SIGINT, _))
    ));
}

/// A child killed by a signal reports the unknown status in both modes
#[test]
fn test_signal_exit_reports_unknown_status() {
    for synchronous in [false, true] {
        let mut supervisor =
            Supervisor::new(SupervisorConfig::default().synchronous(synchronous));
        let mut host = PollLoop::new();

        supervisor
            .exec(&mut host, &sh("kill -TERM $$"))
            .unwrap();
        assert_eq!(
            host.run_until_exit(&mut supervisor, TIMEOUT).unwrap(),
            Some(EXIT_STATUS_UNKNOWN),
            "synchronous = {}",
            synchronous
        );
    }
}
