use std::sync::Arc;
use todo_api::{
    AppState,
    auth::{JwtSessionValidator, SessionState},
    config::{AppConfig, Env},
    create_router,
    repository::{MongoTodoRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, opens the `todos` collection and
/// serves the API.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // RUST_LOG wins; otherwise verbose for our crate, quieter for the stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "todo_api=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let repo = MongoTodoRepository::connect(&config.mongodb_uri, &config.mongodb_database)
        .await
        .expect("FATAL: Failed to configure MongoDB client. Check MONGODB_URI.");
    let repo = Arc::new(repo) as RepositoryState;

    let validator = JwtSessionValidator::from_config(&config);
    if validator.bypass_enabled() {
        tracing::warn!(
            header = todo_api::auth::DEV_USER_HEADER,
            "session bypass is active, APP_ENV is not production"
        );
    }
    let sessions = Arc::new(validator) as SessionState;

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        sessions,
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated");
}
