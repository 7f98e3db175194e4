use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = finaura::api::Cli::parse();
    if let Err(e) = finaura::api::run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
