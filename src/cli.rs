//! Command-line flags.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "boxinit", about = "A lightweight PID-1 process supervisor for containers", disable_version_flag = true)]
pub struct Cli {
    /// Location of the init config file.
    #[arg(long, default_value = "/provision/init.toml")]
    pub config: String,

    /// Location of the log-ingestion Unix socket.
    #[arg(long, default_value = "/var/www/mu-plugins/logger.sock")]
    pub logger: String,

    /// Print version information and exit.
    #[arg(long)]
    pub version: bool,

    /// Switch the logger to a verbose/development profile.
    #[arg(long)]
    pub debug: bool,
}
