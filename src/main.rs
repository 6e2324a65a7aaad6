use anyhow::Result;
use blendopt::{CLIArguments, optimize_main, template_main};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = CLIArguments::parse();

    match args {
        CLIArguments::Optimize(args) => optimize_main(args),
        CLIArguments::Template(args) => template_main(args),
    }
}
