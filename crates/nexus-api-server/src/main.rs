use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use nexus_api_server::auth::{self, JwtManager};
use nexus_api_server::cache::RedisCache;
use nexus_api_server::config::{CorsConfig, Settings};
use nexus_api_server::database::{DbPool, Repository};
use nexus_api_server::handlers;
use nexus_api_server::security::{self, RateLimiter};
use nexus_api_server::services::{AiEngine, ContextBuilder, DocumentService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,nexus_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting Nexus API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("✅ Database connection established");

    let repository = Arc::new(Repository::new(db_pool));
    repository.ensure_schema().await?;

    // Initialize cache (rate-limit counters)
    let redis_cache = RedisCache::connect(&settings.redis).await?;

    // Initialize services
    let jwt_manager = Arc::new(JwtManager::new(&settings.jwt));
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(redis_cache.clone()),
        &settings.rate_limit,
    ));
    let ai_engine = Arc::new(AiEngine::new(settings.llm.clone())?);
    let context_builder = Arc::new(ContextBuilder::default());
    let document_service = Arc::new(DocumentService::new(repository.clone()));

    // Build router
    let app = build_router(
        repository,
        redis_cache,
        jwt_manager,
        rate_limiter,
        ai_engine,
        context_builder,
        document_service,
        &settings.cors,
    );

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_router(
    repository: Arc<Repository>,
    redis_cache: RedisCache,
    jwt_manager: Arc<JwtManager>,
    rate_limiter: Arc<RateLimiter>,
    ai_engine: Arc<AiEngine>,
    context_builder: Arc<ContextBuilder>,
    document_service: Arc<DocumentService>,
    cors: &CorsConfig,
) -> Router {
    // Public routes (no rate limiting, no auth)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Credential exchange (rate limited, no auth)
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh));

    // Business routes (rate limited + authenticated)
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/chat/message", post(handlers::chat::send_message))
        .route(
            "/chat/conversations",
            get(handlers::chat::list_conversations),
        )
        .route(
            "/chat/conversations/{id}",
            get(handlers::chat::get_conversation).delete(handlers::chat::delete_conversation),
        )
        .route(
            "/documents/upload",
            post(handlers::documents::upload_document),
        )
        .route("/documents", get(handlers::documents::list_documents))
        .route("/users/me", put(handlers::users::update_profile))
        .layer(middleware::from_fn(auth::middleware::auth_middleware));

    // Rate limiter gates every API request before business logic
    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            security::rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        // Shared state
        .layer(Extension(repository))
        .layer(Extension(redis_cache))
        .layer(Extension(jwt_manager))
        .layer(Extension(rate_limiter))
        .layer(Extension(ai_engine))
        .layer(Extension(context_builder))
        .layer(Extension(document_service))
        // CORS
        .layer(build_cors(cors))
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        // Body limit (uploads - max 25MB)
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
}

fn build_cors(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
