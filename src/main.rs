use log::{info, warn};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};

use relayd::shutdown::{self, SignalListener};
use relayd::{ActionExecutor, AppConfig, AppState, PinController, Shutdown, api_scope, backend};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RELAYD_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let config = Arc::new(AppConfig::load_from_file(&config_path).map_err(io::Error::other)?);

    let backend = backend::from_config(&config.backend).map_err(io::Error::other)?;
    let controller = Arc::new(PinController::new(backend));
    let signal = Shutdown::new();
    let executor = Arc::new(ActionExecutor::new(
        controller,
        &config.pins,
        signal.clone(),
        config.shutdown_grace,
    ));

    if config.password.is_none() {
        warn!("No password configured, anyone reaching the server can drive the pins");
    }

    let app_state = AppState {
        config: config.clone(),
        executor: executor.clone(),
    };

    let http_cfg = config.http.clone();
    let server = HttpServer::new(move || {
        let scope_path = http_cfg.path.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(api_scope(&scope_path))
    })
    .disable_signals()
    .shutdown_timeout(config.shutdown_grace.as_secs().max(1))
    .client_request_timeout(Duration::from_secs(config.http.timeout));

    let bind_addrs: String;
    let http_cfg = config.http.clone();
    let server = match (&http_cfg.unix_socket, &http_cfg.host) {
        (Some(socket_path), Some(host)) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = format!("{} and {}", socket_path, host);

            server.bind_uds(socket_path)?.bind_auto_h2c(host)?
        }
        (Some(socket_path), None) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = socket_path.clone();

            server.bind_uds(socket_path)?
        }
        (None, Some(host)) => {
            bind_addrs = host.clone();

            server.bind_auto_h2c(host)?
        }
        (None, None) => {
            return Err(io::Error::other(
                "either 'unix_socket' or 'host' must be specified",
            ));
        }
    };

    info!("Starting server on {}...", bind_addrs);

    // registered before serving, a service that can't be stopped must not start
    let mut signals = SignalListener::new()?;

    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(async move {
        let name = signals.recv().await;
        info!("Received signal: {name}");
        // cancels in-flight timers before the server waits on their requests
        signal.trigger();
        handle.stop(true).await;
    });

    shutdown::serve_then_release(server, &executor).await?;
    info!("Graceful shutdown complete");
    Ok(())
}
