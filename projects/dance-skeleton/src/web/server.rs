use crate::cli::Args;
use crate::pipeline::detection::{load_detector, DetectorSlot};
use crate::run_context::ensure_dirs;
use crate::web::api::{health_handler, process_handler};
use crate::web::assets::index_handler;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Process-wide state shared by every request.
pub struct AppState {
    pub args: Args,
    pub detector: DetectorSlot,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.args.max_upload_mb.saturating_mul(1024 * 1024);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route(
            "/process",
            post(process_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest_service("/uploads", ServeDir::new(&state.args.upload_dir))
        .nest_service("/processed", ServeDir::new(&state.args.processed_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(args: Args) -> Result<()> {
    ensure_dirs(Path::new(&args.upload_dir), Path::new(&args.processed_dir))?;

    let model_path = args.model_path.clone();
    let detector =
        tokio::task::spawn_blocking(move || load_detector(model_path.as_deref())).await?;

    let mut current_port = args.port;
    let listener = loop {
        let addr = SocketAddr::new(args.host, current_port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                // Tokio requires a non-blocking socket
                listener.set_nonblocking(true)?;
                info!("Successfully bound to {}", addr);
                break listener;
            }
            Err(e) => {
                warn!("Failed to bind to {}: {}. Trying next port...", addr, e);
                current_port = current_port
                    .checked_add(1)
                    .ok_or_else(|| anyhow::anyhow!("No available ports found"))?;
            }
        }
    };

    let app = build_router(Arc::new(AppState { args, detector }));

    let tokio_listener = tokio::net::TcpListener::from_std(listener)?;
    info!(
        "Dance skeleton server started on http://{:?}",
        tokio_listener.local_addr()?
    );

    axum::serve(tokio_listener, app).await?;

    Ok(())
}
