use tracing::{error, info};

use roomcast::{Config, Hub, LineServer, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = roomcast::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        roomcast::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("roomcast starting");
    info!("Room codes: {}", config.hub.room_codes.join(", "));

    let hub = Hub::spawn(&config.hub);

    let line_server = match LineServer::bind(&config.server).await {
        Ok(server) => server,
        Err(e) => {
            error!(
                "Failed to bind line server on {}:{}: {}",
                config.server.host, config.server.port, e
            );
            std::process::exit(1);
        }
    };
    let line_task = tokio::spawn(line_server.serve(hub.clone()));

    if config.web.enabled {
        let web_server = WebServer::new(&config.web, hub);
        tokio::select! {
            result = line_task => log_exit("Line server", result),
            result = web_server.run() => {
                if let Err(e) = result {
                    error!("Web server stopped: {}", e);
                }
            }
        }
    } else {
        drop(hub);
        log_exit("Line server", line_task.await);
    }
}

fn log_exit(
    name: &str,
    result: Result<roomcast::Result<()>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => info!("{} stopped", name),
        Ok(Err(e)) => error!("{} stopped: {}", name, e),
        Err(e) => error!("{} task failed: {}", name, e),
    }
}
