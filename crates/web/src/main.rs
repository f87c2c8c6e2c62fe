use std::process;

use tracing_subscriber::EnvFilter;
use tracking::{
    backend::InteractiveBackend, config::TrackerConfig, fetcher::FallbackFetcher,
    scheduler, transport::HttpTransport,
};
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();
    // http traces only, `log` records already go through env_logger
    if let Err(why) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        log::debug!("Tracing subscriber not fully installed: {}", why);
    }

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(why) => {
            log::error!("{}", why);
            process::exit(1);
        }
    };

    // tracking engine
    let transport = match HttpTransport::new(config.request_timeout()) {
        Ok(transport) => transport,
        Err(why) => {
            log::error!("Could not create the HTTP client: {}", why);
            process::exit(1);
        }
    };
    let fetcher = match FallbackFetcher::from_config(transport, &config) {
        Ok(fetcher) => fetcher,
        Err(why) => {
            log::error!("{}", why);
            process::exit(1);
        }
    };
    let (tracker, engine) = scheduler::spawn(
        &config,
        fetcher,
        Box::new(InteractiveBackend::in_memory(config.interactive.clone())),
    );

    // web server
    let web_future = start_web_server(
        WebState {
            tracker: tracker.clone(),
        },
        &config.listen_address,
    );

    tokio::select! {
        result = web_future => {
            if let Err(why) = result {
                log::error!("Dashboard API failed: {}", why);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down.");
        }
    }

    tracker.shutdown();
    if let Err(why) = engine.await {
        log::error!("Tracking engine panicked: {}", why);
    }
}
