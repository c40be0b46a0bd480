use boombox::configuration::config::Config;
use boombox::controller::Controller;
use log::{error, info};

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the trace.
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let config = Config::from_args().unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(2);
    });

    let controller = Controller::new(config);
    match controller.run().await {
        Ok(count) => {
            info!("Done, {} message(s)", count);
            // Exit explicitly: a pending stdin read would otherwise hold the
            // runtime open.
            std::process::exit(0);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
