//! Waypoint server binary.
//!
//! ```text
//! config (TOML) → logging/metrics → App (routes, middleware) → build
//!     → bind → serve until SIGINT/SIGTERM
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use waypoint::collab::JsonBodyParser;
use waypoint::config::{load_config, validation::validate_config, AppConfig};
use waypoint::lifecycle::{or_exit, signals, Shutdown};
use waypoint::observability::{logging, metrics};
use waypoint::{handler, recovery, App, HttpServer, Router};

#[derive(Debug, Parser)]
#[command(name = "waypoint", version, about = "HTTP dispatch server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn demo_app(config: AppConfig) -> App {
    let mut app = App::new(config);
    app.with_body_parser(JsonBodyParser);

    or_exit(
        app.use_middleware(vec![
            logging::access_log(),
            recovery(|err, req, res, next| {
                Box::pin(async move {
                    tracing::warn!(request_id = %req.request_id(), error = %err, "Request failed");
                    next.run(err, req, res).await
                })
            }),
        ]),
        "Failed to register global middleware",
    );

    or_exit(
        app.get(
            "/",
            handler(|_req, res| {
                Box::pin(async move {
                    res.send("waypoint");
                    Ok(())
                })
            }),
        ),
        "Failed to register /",
    );
    or_exit(
        app.get(
            "/health",
            handler(|_req, res| {
                Box::pin(async move {
                    res.try_set_header("cache-control", "no-store")?;
                    res.json(&json!({ "status": "ok" }))
                })
            }),
        ),
        "Failed to register /health",
    );

    let mut api = Router::new();
    let echo = or_exit(api.route("/echo/:word", Vec::new()), "Failed to register /echo/:word");
    or_exit(
        echo.get(handler(|req, res| {
            Box::pin(async move {
                let word = req.param("word").unwrap_or_default().to_string();
                res.json(&json!({ "word": word, "query": req.query() }))
            })
        })),
        "Failed to register GET /echo/:word",
    );
    or_exit(
        api.post(
            "/echo",
            handler(|req, res| {
                Box::pin(async move {
                    let body = req.body().cloned().unwrap_or_default();
                    res.json(&body)
                })
            }),
        ),
        "Failed to register POST /echo",
    );
    or_exit(app.mount("/api", api), "Failed to mount /api");

    app
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => or_exit(load_config(path), "Failed to load configuration"),
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Err(errors) = validate_config(&config) {
        let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        waypoint::lifecycle::fatal("Invalid configuration", joined.join(", "));
    }

    logging::init(&config.observability);
    tracing::info!("waypoint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        handler_failure_status = config.dispatch.handler_failure_status,
        body_limit_bytes = config.dispatch.body_limit_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = or_exit(
            config.observability.metrics_address.parse(),
            "Failed to parse metrics address",
        );
        or_exit(metrics::init_metrics(addr), "Failed to start metrics exporter");
    }

    let dispatcher = or_exit(demo_app(config.clone()).build(), "Failed to build routes");
    let dispatcher = Arc::new(dispatcher);

    let listener = or_exit(
        TcpListener::bind(&config.listener.bind_address).await,
        "Failed to bind listener",
    );
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(address = %addr, "Listening for connections");
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, dispatcher);
    or_exit(server.run(listener, shutdown.subscribe()).await, "Server error");

    tracing::info!("Shutdown complete");
}
