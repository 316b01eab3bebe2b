use console::{StyledObject, style};
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

/// Initialize the stderr logger; `RUST_LOG` overrides the level.
///
/// Records carry the library module they come from, so supervisor, reader and
/// poller diagnostics stay apart from the program's own output on stdout.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    Builder::new()
        .filter_level(default_level)
        .parse_env(Env::default().filter("RUST_LOG"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                level_tag(record.level()),
                style(format!("[{}]", component(record.target()))).dim(),
                record.args()
            )
        })
        .init();
}

fn level_tag(level: Level) -> StyledObject<&'static str> {
    match level {
        Level::Error => style("ERROR").red().bold(),
        Level::Warn => style("WARN ").yellow().bold(),
        Level::Info => style("INFO ").green(),
        Level::Debug => style("DEBUG").cyan(),
        Level::Trace => style("TRACE").dim(),
    }
}

/// Last path segment of a log target: `proc_command::supervisor::poller` -> `poller`
fn component(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_keeps_last_segment() {
        assert_eq!(component("proc_command::supervisor::poller"), "poller");
        assert_eq!(component("proc_command"), "proc_command");
        assert_eq!(component(""), "");
    }

    #[test]
    fn level_tags_have_equal_width() {
        for level in [
            Level::Error,
            Level::Warn,
            Level::Info,
            Level::Debug,
            Level::Trace,
        ] {
            assert_eq!(level_tag(level).force_styling(false).to_string().len(), 5);
        }
    }
}
