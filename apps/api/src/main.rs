use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_cell::services::notifier::{LogNotifier, Notifier};
use booking_cell::services::sweeper::ExpirySweeper;
use conversation_cell::services::engine::ConversationEngine;
use conversation_cell::services::stores::{
    create_redis_pool, RedisCodeStore, RedisConversationStore,
};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting appointment API server");

    let config = AppConfig::from_env();

    let pool = match create_redis_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let state = Arc::new(config);

    let engine = Arc::new(ConversationEngine::new(
        &state,
        Arc::new(RedisConversationStore::new(pool.clone())),
        Arc::new(RedisCodeStore::new(pool)),
        notifier.clone(),
    ));

    let sweeper = ExpirySweeper::new(&state, notifier.clone());
    tokio::spawn(sweeper.run());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state.clone(), engine, notifier)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], state.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
