mod api;
mod audio;
mod cache;
mod config;
mod ebml;
mod error;
mod fingerprint_store;
mod track_registry;
mod webm_encoder;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use auralis_dsp::DefaultFingerprintGenerator;
use cache::StreamingCache;
use config::Config;
use fingerprint_store::FingerprintStore;
use track_registry::InMemoryTrackRegistry;

/// Shared handles every request handler needs. Constructed once at
/// startup and cloned (cheap: every field is an `Arc`) into each handler
/// via axum's `State` extractor, rather than a global singleton.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<StreamingCache>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    tracing::info!("starting auralis mastering engine v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    std::fs::create_dir_all(config.fingerprint_store_dir())
        .expect("failed to create fingerprint store directory");
    std::fs::create_dir_all(&config.tmp_root).expect("failed to create tmp root");

    let track_registry = Arc::new(InMemoryTrackRegistry::new());
    seed_track_registry(&track_registry);

    let fingerprint_store = Arc::new(FingerprintStore::new(config.fingerprint_store_dir()));
    let fingerprint_generator = Arc::new(DefaultFingerprintGenerator);

    let bind_addr = config.bind_addr.clone();
    let cache = StreamingCache::new(config, track_registry, fingerprint_store, fingerprint_generator);
    let state = AppState { cache };

    let app = Router::new()
        .route("/health", get(api::health::health_handler))
        .route("/chunk", get(api::chunk::chunk_handler))
        .route("/metadata", get(api::metadata::metadata_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = bind_addr.parse().expect("invalid AURALIS_BIND_ADDR");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));

    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.expect("server error");
}

/// Minimal stand-in for the real library sync (§1 collaborators, see
/// `track_registry`): if `AURALIS_LIBRARY_ROOT` is set, every regular
/// file directly under it is registered, in sorted filename order,
/// starting at track id 0. Absent a real library service this is the
/// only way to get a `track_id` to test against.
fn seed_track_registry(registry: &InMemoryTrackRegistry) {
    let Ok(root) = std::env::var("AURALIS_LIBRARY_ROOT") else {
        tracing::warn!("AURALIS_LIBRARY_ROOT not set; track registry starts empty");
        return;
    };

    let mut entries: Vec<_> = match std::fs::read_dir(&root) {
        Ok(dir) => dir.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            tracing::warn!(root, error = %e, "failed to scan library root");
            return;
        }
    };
    entries.sort();

    let mut track_id = 0u32;
    for path in entries {
        if path.is_file() {
            registry.register(track_id, path.clone());
            tracing::debug!(track_id, path = %path.display(), "registered track");
            track_id += 1;
        }
    }
    tracing::info!(count = track_id, root, "track registry seeded");
}
