use clap::Parser;
use opalstack_ensure::{run, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Operator configuration file
    #[arg(env = "OPALSTACK_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    run(Config::load(&args.config)?).await
}
