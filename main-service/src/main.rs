use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afisha_stats_client::StatsClient;

use afisha_server::{
    AppState,
    config::Config,
    middleware::log_errors,
    routes::{categories, comments, compilations, events, requests, users},
    stats::StatsGateway,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'afisha_main';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let stats = Arc::new(StatsGateway::new(
        StatsClient::new(&config.stats_server_url),
        config.app_name.clone(),
    ));

    let state = AppState {
        pool,
        config: config.clone(),
        stats,
    };

    let admin = Router::new()
        .route("/users", post(users::create_user).get(users::find_users))
        .route("/users/{user_id}", delete(users::remove_user))
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{category_id}",
            patch(categories::update_category).delete(categories::remove_category),
        )
        .route("/events", get(events::find_events_by_admin))
        .route("/events/{event_id}", patch(events::update_event_by_admin))
        .route("/comments", get(comments::find_comments_by_admin))
        .route(
            "/comments/{comment_id}",
            delete(comments::remove_comment_by_admin),
        )
        .route("/compilations", post(compilations::create_compilation))
        .route(
            "/compilations/{compilation_id}",
            patch(compilations::update_compilation).delete(compilations::remove_compilation),
        );

    let private = Router::new()
        .route(
            "/{user_id}/events",
            post(events::create_event).get(events::find_initiator_events),
        )
        .route(
            "/{user_id}/events/{event_id}",
            get(events::find_initiator_event).patch(events::update_initiator_event),
        )
        .route(
            "/{user_id}/events/{event_id}/requests",
            get(events::find_event_requests).patch(events::update_request_statuses),
        )
        .route(
            "/{user_id}/requests",
            post(requests::add_request).get(requests::find_user_requests),
        )
        .route(
            "/{user_id}/requests/{request_id}/cancel",
            patch(requests::cancel_request),
        )
        .route(
            "/{user_id}/events/{event_id}/comments",
            post(comments::add_comment).get(comments::find_own_comments),
        )
        .route(
            "/{user_id}/events/{event_id}/comments/search",
            get(comments::search_own_comments),
        )
        .route(
            "/{user_id}/events/{event_id}/comments/{comment_id}",
            get(comments::find_comment)
                .patch(comments::edit_comment)
                .delete(comments::remove_comment),
        );

    let public = Router::new()
        .route("/events", get(events::find_published_events))
        .route("/events/{event_id}", get(events::find_published_event))
        .route(
            "/events/{event_id}/comments",
            get(comments::find_event_comments),
        )
        .route("/categories", get(categories::find_categories))
        .route(
            "/categories/{category_id}",
            get(categories::find_category_by_id),
        )
        .route("/compilations", get(compilations::find_compilations))
        .route(
            "/compilations/{compilation_id}",
            get(compilations::find_compilation),
        );

    let router = Router::new()
        .nest("/admin", admin)
        .nest("/users", private)
        .merge(public)
        .layer(middleware::from_fn(log_errors));

    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    let app = router.with_state(state);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Main server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
