//! Main application entry point.

use annot8_app::AppConfig;
use clap::Parser;

fn main() {
    env_logger::init();
    log::info!("Starting annot8");

    let config = AppConfig::parse();
    match annot8_app::run(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
