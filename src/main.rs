use aperture::config::Config;
use aperture::server::router::{AppState, aperture_router};
use aperture::sync::gallery_loader;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_toml();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        loglevel = %cfg.basic.loglevel,
        lightroom_api = %cfg.lightroom.api_url,
        proxy = %cfg.lightroom.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        webhook_enabled = cfg.basic.webhook_secret().is_some(),
        token_encryption = !cfg.lightroom.token_encryption_key.is_empty(),
        media_dir = ?cfg.sync.media_dir,
        "configuration loaded"
    );

    let db = aperture::db::spawn(&cfg.basic.database_url).await;
    let state = AppState::new(db.clone(), &cfg)?;

    if let Some(seed_path) = cfg.sync.galleries_file.clone() {
        let cipher = state.cipher.clone();
        tokio::spawn(async move {
            let seed = match gallery_loader::load_from_file(&seed_path) {
                Ok(seed) => seed,
                Err(e) => {
                    warn!(
                        path = %seed_path.display(),
                        error = %e,
                        "Background task: failed to read gallery seed file."
                    );
                    return;
                }
            };
            match gallery_loader::apply(&db, &cipher, seed).await {
                Ok(report) => info!(
                    path = %seed_path.display(),
                    galleries = report.galleries,
                    token = report.token,
                    "Background task: gallery seed applied."
                ),
                Err(e) => warn!(
                    path = %seed_path.display(),
                    error = %e,
                    "Background task: failed to apply gallery seed."
                ),
            }
        });
    }

    let sync = state.sync.clone();
    let app = aperture_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        if sync.registry().cancel_active() {
            info!("Cancelled the running sync for shutdown.");
        }
    })
    .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
