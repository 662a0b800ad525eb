use std::net::SocketAddr;

use mastery_backend::config::Config;
use mastery_backend::db::Db;
use mastery_backend::state::AppState;
use mastery_backend::{create_app, logging, seed};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let db = match Db::connect(&config.database_url).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "database initialization failed");
            std::process::exit(1);
        }
    };

    if seed::seeding_enabled() {
        seed::seed_demo_data(&db).await;
    }

    let state = AppState::new(db, config.placement.clone());
    let app = create_app(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, "mastery-backend listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind failed");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
