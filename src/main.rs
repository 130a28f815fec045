use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use reqwest::Client;

use bitefinder::config::Config;
use bitefinder::google_maps::MapsClient;
use bitefinder::logging;
use bitefinder::recommend::QueryService;
use bitefinder::server::{self, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    let config = Config::from_env();

    if let Err(e) = logging::setup_logging(&config.log_dir, "bitefinder.log", config.log_level) {
        eprintln!("Failed to set up logging: {}", e);
        return Ok(());
    }

    config.log_summary();
    if !config.data_path.exists() {
        log::warn!(
            "Combined table {} does not exist yet; queries will return no results until build_dataset runs",
            config.data_path.display()
        );
    }

    let state = web::Data::new(AppState {
        queries: QueryService::new(config.data_path.clone()),
        maps: MapsClient::new(Client::new(), config.google_maps_api_key.clone()),
    });

    let governor_config = GovernorConfigBuilder::default()
        .per_second(config.requests_per_second)
        .burst_size(config.burst_size)
        .finish()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid rate limit configuration"))?;

    info!("Starting BiteFinder server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Governor::new(&governor_config))
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
