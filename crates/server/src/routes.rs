use axum::{routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;

pub mod stocks;

pub use stocks::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::OK)
}

/// Build the application router: stock CRUD, health and API docs
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let stock_routes = Router::new()
        .route(
            "/api/v1/stocks",
            get(stocks::list_stocks)
                .post(stocks::create_stock)
                .options(stocks::preflight),
        )
        .route(
            "/api/v1/stocks/:id",
            get(stocks::get_stock)
                .put(stocks::update_stock)
                .delete(stocks::delete_stock)
                .options(stocks::preflight),
        );

    Router::new()
        .route("/health", get(health))
        .merge(stock_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        // 响应返回时打点，包含状态码与耗时
                        .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                        // 失败（5xx 等）时以 ERROR 记录
                        .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
                )
                .layer(cors),
        )
}
