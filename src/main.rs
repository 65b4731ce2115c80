use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use carshare::config::AppConfig;
use carshare::db;
use carshare::handlers;
use carshare::services::identity::remote::RemoteIdentityProvider;
use carshare::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    tracing::info!("using identity service at {}", config.identity_url);
    let identity = RemoteIdentityProvider::new(config.identity_url.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        identity: Box::new(identity),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/cars",
            get(handlers::cars::list_cars).post(handlers::cars::create_car),
        )
        .route(
            "/api/cars/:id",
            get(handlers::cars::get_car)
                .put(handlers::cars::update_car)
                .delete(handlers::cars::delete_car),
        )
        .route(
            "/api/cars/:id/availability",
            get(handlers::cars::check_availability),
        )
        .route(
            "/api/cars/:id/blocks",
            get(handlers::cars::list_blocks).post(handlers::cars::create_block),
        )
        .route("/api/blocks/:id", delete(handlers::cars::delete_block))
        .route(
            "/api/locations",
            get(handlers::locations::list_locations).post(handlers::locations::create_location),
        )
        .route(
            "/api/locations/:id",
            get(handlers::locations::get_location)
                .put(handlers::locations::update_location)
                .delete(handlers::locations::delete_location),
        )
        .route(
            "/api/locations/:id/cars",
            get(handlers::locations::list_location_cars),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking).patch(handlers::bookings::update_status),
        )
        .route(
            "/api/bookings/:id/review",
            post(handlers::bookings::create_review),
        )
        .route(
            "/api/me",
            get(handlers::users::me).put(handlers::users::update_me),
        )
        .route("/api/dashboard", get(handlers::users::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
