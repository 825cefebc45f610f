pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;

pub use auth::{check_login_handler, login_handler, logout_handler, register_handler};
pub use middleware::require_auth;
pub use rest::{
    ask_handler, complete_lecture_handler, generate_lecture_handler, generate_plan_handler,
    get_plan_handler, learning_progress_handler, list_lectures_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the complete application router, including the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/check_login", get(check_login_handler))
        .route("/generate_plan", post(generate_plan_handler))
        .route("/learning_progress", get(learning_progress_handler))
        .route("/plans/{id}", get(get_plan_handler))
        .route(
            "/plans/{id}/lectures",
            get(list_lectures_handler).post(generate_lecture_handler),
        )
        .route("/lectures/{id}/complete", post(complete_lecture_handler))
        .route("/api/ask", post(ask_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
