//! # table-dedup
//!
//! Command line front end for the deduplication engine. Loads the
//! configuration, connects to Oracle and runs a single deduplication,
//! exiting with the outcome's status code.

use clap::Parser;
use log::{error, info};
use std::process;
use table_dedup::application::runtime::RuntimeContext;
use table_dedup::config::{AppConfig, CliArgs};
use table_dedup::domain::entities::CancelFlag;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match &args.config {
        Some(config_path) => match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => AppConfig::from_cli(&args),
    };
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(e.status_code());
    }

    // 4. Initialize Hexagonal Components
    let orchestrator = match RuntimeContext::init(&config).and_then(|ctx| ctx.orchestrator(&config)) {
        Ok(o) => o,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            process::exit(e.status_code());
        }
    };

    // 5. Run
    let request = config.dedup.to_request();
    let outcome = orchestrator.deduplicate(&request, &CancelFlag::new());
    let (code, message) = outcome.into_status();

    if code == 0 {
        info!("{}", message);
    } else {
        error!("{}", message);
    }
    println!("{}", message);
    process::exit(code);
}
