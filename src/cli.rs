use std::path::PathBuf;

use clap::Parser;

/// Checks the state of every Docker container on this host and reports the
/// result to Icinga2.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file to use.
    #[arg(short = 'f', long, default_value = "settings.toml")]
    pub config_file: PathBuf,
}
