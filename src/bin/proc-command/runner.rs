use console::style;
use log::{debug, info, warn};
use proc_command::command::set_environment;
use proc_command::execution::EXIT_STATUS_UNKNOWN;
use proc_command::{
    Atom, Command, Emission, Message, Outlet, PollLoop, Supervisor, SupervisorConfig,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Longest single wait of the event loop
const TURN_SLICE: Duration = Duration::from_millis(250);

/// Configuration for one supervised run
pub struct RunConfig {
    pub binary: bool,
    pub synchronous: bool,
    pub cwd: Option<PathBuf>,
    pub env: Vec<String>,
    pub send: Vec<String>,
    pub timeout: Option<u64>,
    pub json: bool,
    pub program: String,
    pub args: Vec<String>,
}

/// Run the program to completion and return its exit status
pub fn run_command(config: RunConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let mut supervisor_config = SupervisorConfig::default()
        .binary(config.binary)
        .synchronous(config.synchronous);
    if let Some(dir) = config.cwd {
        debug!("Using working directory: {:?}", dir);
        supervisor_config = supervisor_config.working_dir(dir);
    }

    for assignment in &config.env {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("invalid --env '{}', expected NAME=VALUE", assignment))?;
        set_environment(name, value)?;
    }

    if config.synchronous && !config.send.is_empty() {
        warn!("--send has no effect with --synchronous, the program has exited by then");
    }

    let mut supervisor = Supervisor::new(supervisor_config);
    let mut host = PollLoop::new();
    debug!(
        "Output mode: {:?}, synchronous: {}",
        supervisor.config().mode,
        supervisor.config().synchronous
    );

    let mut fields = vec![Atom::Symbol(config.program)];
    fields.extend(config.args.into_iter().map(Atom::Symbol));

    info!("Executing: {}", proc_command::message::render_fields(&fields));
    if let Err(e) = supervisor.exec(&mut host, &fields) {
        print_events(&mut host, config.json)?;
        return Err(e.into());
    }

    for text in config.send {
        supervisor.send(&[Atom::Symbol(text)])?;
    }

    let deadline = config
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut interrupted = false;

    loop {
        if let Some(code) = print_events(&mut host, config.json)? {
            return Ok(code);
        }
        if !supervisor.is_running() {
            return Ok(EXIT_STATUS_UNKNOWN);
        }

        if let Some(deadline) = deadline {
            if !interrupted && Instant::now() >= deadline {
                warn!("Timeout reached, interrupting pid {:?}", supervisor.pid());
                supervisor.dispatch(&mut host, &Command::Kill);
                interrupted = true;
            }
        }

        host.turn(&mut supervisor, TURN_SLICE)?;
    }
}

/// Print queued messages; returns the exit status if one was among them
fn print_events(
    host: &mut PollLoop,
    json: bool,
) -> Result<Option<i32>, Box<dyn std::error::Error>> {
    let mut status = None;
    for event in host.take_events() {
        if let (Outlet::Done, Message::Float(code)) = (event.outlet, &event.message) {
            status = Some(*code as i32);
        }
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_plain(&event);
        }
    }
    Ok(status)
}

fn print_plain(event: &Emission) {
    let outlet = match event.outlet {
        Outlet::Stdout => style(event.outlet).cyan(),
        Outlet::Stderr => style(event.outlet).yellow(),
        Outlet::Done => style(event.outlet).bold(),
    };
    println!("{}{} {}", outlet, style(":").dim(), event.message);
}
