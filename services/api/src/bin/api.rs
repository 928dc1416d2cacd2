//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, draft_llm::OpenAiDraftAdapter, moderation_llm::OpenAiModerationAdapter,
        seo_llm::OpenAiSeoAdapter, summary_llm::OpenAiSummaryAdapter, tag_llm::OpenAiTagAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        analytics::get_analytics_handler,
        assist::{draft_handler, seo_handler, summary_handler, tags_handler},
        auth::{login_handler, logout_handler, signup_handler},
        blogs::{
            blog_stats_handler, create_blog_handler, delete_blog_handler, get_blog_handler,
            list_blogs_handler, publish_blog_handler, unpublish_blog_handler, update_blog_handler,
        },
        comments::{create_comment_handler, delete_comment_handler, list_comments_handler},
        moderation::{
            moderation_queue_handler, update_blog_status_handler, update_comment_status_handler,
        },
        rest::ApiDoc,
        state::AppState,
        track_visitor,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let classifier = Arc::new(OpenAiModerationAdapter::new(
        openai_client.clone(),
        config.moderation_model.clone(),
        config.moderation_timeout,
    ));
    let draft_adapter = Arc::new(OpenAiDraftAdapter::new(
        openai_client.clone(),
        config.assist_model.clone(),
    ));
    let summary_adapter = Arc::new(OpenAiSummaryAdapter::new(
        openai_client.clone(),
        config.assist_model.clone(),
    ));
    let tag_adapter = Arc::new(OpenAiTagAdapter::new(openai_client.clone()));
    let seo_adapter = Arc::new(OpenAiSeoAdapter::new(
        openai_client.clone(),
        config.assist_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        classifier,
        draft_adapter,
        summary_adapter,
        tag_adapter,
        seo_adapter,
    });

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public content routes; every render is recorded as a visitor event.
    let content_routes = Router::new()
        .route("/blogs", get(list_blogs_handler))
        .route("/blogs/{slug}", get(get_blog_handler))
        .route(
            "/blogs/{slug}/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            track_visitor,
        ));

    let auth_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Admin routes; each handler authenticates the caller and requires the
    // admin role before touching anything.
    let admin_routes = Router::new()
        .route("/admin/blogs", post(create_blog_handler))
        .route(
            "/admin/blogs/{id}",
            put(update_blog_handler).delete(delete_blog_handler),
        )
        .route("/admin/blogs/{id}/publish", post(publish_blog_handler))
        .route("/admin/blogs/{id}/unpublish", post(unpublish_blog_handler))
        .route("/admin/blogs/{id}/status", put(update_blog_status_handler))
        .route("/admin/blogs/{id}/stats", get(blog_stats_handler))
        .route("/admin/comments/{id}", delete(delete_comment_handler))
        .route(
            "/admin/comments/{id}/status",
            put(update_comment_status_handler),
        )
        .route("/admin/moderation/queue", get(moderation_queue_handler))
        .route("/admin/analytics", get(get_analytics_handler))
        .route("/admin/assist/draft", post(draft_handler))
        .route("/admin/assist/summary", post(summary_handler))
        .route("/admin/assist/tags", post(tags_handler))
        .route("/admin/assist/seo", post(seo_handler));

    // Combine API routes
    let api_router = Router::new()
        .merge(content_routes)
        .merge(auth_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
