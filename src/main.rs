use std::process::ExitCode;

use clap::Parser;

mod cli;
mod config;
mod config_file;
mod icinga;
mod inventory;
mod verdict;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init();

    let args = cli::Args::parse();

    let config = match config_file::load(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Unable to read config file: {}: {e}",
                args.config_file.display()
            );
            return ExitCode::FAILURE;
        }
    };
    log::debug!("Loaded {config:?}");

    let containers = inventory::collect_local().await;
    let verdict = verdict::aggregate(&containers);
    log::info!(
        "Verdict: {} ({})",
        verdict.plugin_output,
        verdict.performance_data
    );

    match icinga::report(&config, &verdict).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(pretty) => println!("{pretty}"),
            Err(e) => log::error!("Unable to print the Icinga2 response: {e}"),
        },
        Err(e) => {
            log::error!("Check result was not delivered: {e:?}");
            eprintln!("Unable to submit check result: {e}");
        }
    }

    ExitCode::SUCCESS
}
