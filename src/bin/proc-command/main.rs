//! proc-command CLI - Run a program and stream its output as messages

mod cli;
mod logging;
mod runner;

use clap::Parser;
use cli::Cli;
use console::style;
use runner::{RunConfig, run_command};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    let config = RunConfig {
        binary: cli.binary,
        synchronous: cli.synchronous,
        cwd: cli.cwd,
        env: cli.env,
        send: cli.send,
        timeout: cli.timeout,
        json: cli.json,
        program: cli.program,
        args: cli.args,
    };

    match run_command(config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}
