use clap::Parser;
use stride_app::app::{run, AppConfig, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default();
    if let Err(err) = run(cli, config) {
        eprintln!("stride: {err:#}");
        std::process::exit(1);
    }
}
