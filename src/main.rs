use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes,
    services::audit_service::spawn_audit_writer,
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let audit = spawn_audit_writer(pool.clone());
    let app_state = AppState::new(pool, audit);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let admin_api = Router::new()
        .route(
            "/api/assessment-links",
            get(routes::links::list_links).post(routes::links::create_link),
        )
        .route(
            "/api/assessment-links/email-history/all",
            get(routes::links::all_email_history),
        )
        .route(
            "/api/assessment-links/:link_id/deactivate",
            post(routes::links::deactivate_link),
        )
        .route(
            "/api/assessment-links/:link_id/results",
            get(routes::links::link_results),
        )
        .route(
            "/api/assessment-links/:link_id/email-history",
            get(routes::links::link_email_history),
        )
        .route(
            "/api/assessment-links/:link_id/send-email",
            post(routes::links::send_link_email),
        )
        .route("/api/tests", post(routes::links::create_test))
        .route("/api/tests/:test_id", get(routes::links::get_test))
        .layer(axum::middleware::from_fn(auth::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.admin_rps),
            rate_limit::rps_middleware,
        ));

    let public_api = Router::new()
        .route(
            "/api/public/assessment-links/:token/validate",
            get(routes::public::validate_link),
        )
        .route(
            "/api/public/assessment-links/:token/start",
            post(routes::public::start_attempt),
        )
        .route(
            "/api/public/assessment-links/:token/save/:attempt_id",
            post(routes::public::save_answers),
        )
        .route(
            "/api/public/assessment-links/:token/submit/:attempt_id",
            post(routes::public::submit_attempt),
        )
        .route(
            "/api/public/assessment-links/:token/order",
            post(routes::public::create_order),
        )
        .route("/api/webhook/payment", post(routes::payment::payment_webhook))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(admin_api)
        .merge(public_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
