use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use venver::{Dispatcher, Environment};

const LOG_VAR: &str = "VENVER_LOG";

/// Logs go to stderr: stdout is evaluated by the calling shell.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let mut stdout = std::io::stdout().lock();
    let code = Dispatcher::new(Environment::new()).run(args.as_slice(), &mut stdout);
    let _ = stdout.flush();
    std::process::exit(code);
}
