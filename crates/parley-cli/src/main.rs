mod cli;
mod commands;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "parley=info";

/// `RUST_LOG` wins, then `--log-level`, then `[logging].filter`.
fn init_logging(flag: Option<&str>, configured: Option<&str>) {
    let directive = flag.or(configured).unwrap_or(DEFAULT_FILTER);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = cli::parse();

    let path = commands::resolve_path(args.config.as_deref());
    let configured = path
        .as_deref()
        .ok()
        .and_then(|p| commands::load(p).ok())
        .map(|c| c.logging.filter);
    init_logging(args.log_level.as_deref(), configured.as_deref());

    match commands::execute(args.command, path) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("parley: {e}");
            ExitCode::FAILURE
        }
    }
}
