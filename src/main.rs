use clap::Parser;
use scopes::cli::commands::Cli;
use scopes::cli::handlers;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so stdout stays parseable; SCOPES_LOG=debug for detail
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("SCOPES_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
