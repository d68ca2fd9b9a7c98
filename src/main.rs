use anyhow::Context;
use clap::Parser;
use traffic_merge::cli::{run, Cli};
use traffic_merge::utils::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref()).context("initialising logging")?;
    run(cli).context("traffic-merge failed")
}
