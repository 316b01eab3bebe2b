use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "proc-command")]
#[command(version, about = "Run a program and stream its output as messages", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Parsed text output, exit status on the done outlet
    proc-command printf 'foo 1 2\\n42\\n'

    # Raw bytes as number lists
    proc-command -b head -c 4 /dev/urandom

    # Feed stdin, set the environment, interrupt after 2 seconds
    proc-command -e GREETING=hi --send hello --timeout 2 sh -c 'l=$(head -c 5); echo $GREETING $l'

    # JSON lines for scripting
    proc-command --json ls -1
")]
pub struct Cli {
    /// Emit output bytes as number lists instead of parsed text
    #[arg(short = 'b', long)]
    pub binary: bool,

    /// Block until the program exits instead of polling
    #[arg(short = 's', long)]
    pub synchronous: bool,

    /// Working directory of the program
    #[arg(short = 'C', long = "cwd", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment variable set before the program starts
    #[arg(short = 'e', long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<String>,

    /// Text written verbatim to the program's stdin after start
    #[arg(long = "send", value_name = "TEXT")]
    pub send: Vec<String>,

    /// Interrupt the program after this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print one JSON object per message
    #[arg(long)]
    pub json: bool,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Program to run
    #[arg(value_name = "PROGRAM")]
    pub program: String,

    /// Program arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
