use axum::middleware::{from_fn, from_fn_with_state};
use axum::{Extension, Router};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;

use crate::api::auth::AuthDoc;
use crate::config::Config;
use crate::db::queries::agency::AgencyDoc;
use crate::db::queries::cancellation::CancellationDoc;
use crate::db::queries::notification::NotificationDoc;
use crate::db::queries::rota::RotaDoc;
use crate::db::queries::shift::ShiftDoc;
use crate::db::queries::swap::SwapDoc;
use crate::db::queries::user::UserDoc;
use crate::middleware::auth::{create_identity_cache, identity_middleware, jwt_middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Config::init();

    tracing_subscriber::fmt().with_target(true).init();

    let identity_cache = create_identity_cache();
    let pool = db::pool::get_db_pool().await?;
    sqlx::migrate!().run(&pool).await?;

    let merged_doc = AuthDoc::openapi()
        .merge_from(UserDoc::openapi())
        .merge_from(ShiftDoc::openapi())
        .merge_from(AgencyDoc::openapi())
        .merge_from(RotaDoc::openapi())
        .merge_from(SwapDoc::openapi())
        .merge_from(CancellationDoc::openapi())
        .merge_from(NotificationDoc::openapi());

    // Public routes
    let public_routes = Router::new().merge(api::auth::auth_routes());

    // Private routes
    let private_routes = Router::new()
        .merge(api::auth::secure_auth_routes())
        .merge(api::user::user_routes())
        .merge(api::shift::shift_routes())
        .merge(api::agency::agency_routes())
        .merge(api::rota::rota_routes())
        .merge(api::swap::swap_routes())
        .merge(api::cancellation::cancellation_routes())
        .merge(api::notification::notification_routes())
        .route_layer(from_fn_with_state(pool.clone(), identity_middleware))
        .route_layer(from_fn(jwt_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .layer(Extension(identity_cache.clone()))
        .with_state(pool.clone());

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    run_server(app, shutdown_tx, pool).await;
    println!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal(mut shutdown_rx: broadcast::Receiver<()>, pool: PgPool) {
    tokio::select! {
        _ = signal::ctrl_c() => println!("Received Ctrl+C, shutting down..."),
        _ = shutdown_rx.recv() => println!("Received shutdown signal."),
    }
    println!("🛠️ Closing database pool...");
    pool.close().await;
    println!("✅ Database pool closed. Server shutting down.");
}

async fn run_server(app: Router, shutdown_tx: broadcast::Sender<()>, pool: PgPool) {
    let addr = SocketAddr::from(([127, 0, 0, 1], Config::get().port));
    println!("Server running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await.expect("Failed to bind listener");

    let shutdown = shutdown_signal(shutdown_tx.subscribe(), pool.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Server encountered an error");
}
