use std::process;

use rsinvoke::cli::{self, output, Cli};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

fn main() {
    let argv: Vec<_> = std::env::args_os().collect();
    let cli = Cli::bootstrap(argv.iter().cloned());

    setup_logging(cli.debug);

    match cli::execute(&cli, argv) {
        Ok(code) => process::exit(code),
        Err(e) => {
            output::error(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Targets whose events are dropped regardless of `-d`.
const QUIET_TARGETS: [&str; 2] = ["walkdir", "clap"];

fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn is_quiet_target(target: &str) -> bool {
    QUIET_TARGETS.iter().any(|quiet| target.starts_with(quiet))
}

/// Log to stderr; each `-d` lowers the threshold one level below WARN.
fn setup_logging(verbosity: u8) {
    let level = log_level(verbosity);
    let spans = if level == LevelFilter::TRACE {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .with_span_events(spans)
        .with_filter(level)
        .with_filter(filter_fn(|metadata| !is_quiet_target(metadata.target())));

    tracing_subscriber::registry().with(layer).init();
    tracing::debug!("logging at {level}");
}
