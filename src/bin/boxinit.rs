use anyhow::Context;
use boxinit::cli::Cli;
use boxinit::config::Config;
use boxinit::supervisor::Supervisor;
use boxinit::{fatal, version};
use clap::Parser;

#[tokio::main]
pub async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version::banner());
        return;
    }

    let mut builder = env_logger::Builder::from_default_env();
    if cli.debug {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();

    let config = match Config::load(&cli.config).with_context(|| format!("loading config from {}", cli.config)) {
        Ok(cfg) => cfg,
        // `{:?}` walks the anyhow context chain so the path context added
        // above shows up alongside the underlying parse/IO error.
        Err(e) => fatal::die("failed loading config", format!("{e:?}")),
    };

    let supervisor = Supervisor::new(config, cli.logger);
    supervisor.run().await;
}
