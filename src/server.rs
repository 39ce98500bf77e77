/// HTTP server assembly and startup
use crate::{api, context::AppContext, error::ApiResult};
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the full application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.service.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::routes())
        .route("/ws/:wishlist_id", get(api::realtime::wishlist_updates))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(ctx)
}

/// Bind and serve until the process is stopped
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = format!(
        "{}:{}",
        ctx.config.service.hostname, ctx.config.service.port
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    let router = build_router(ctx);
    axum::serve(listener, router).await?;

    Ok(())
}

async fn health(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let database = crate::db::test_connection(&ctx.db).await.is_ok();

    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "version": ctx.config.service.version,
        "database": database,
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if parsed.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_test_context() {
        let ctx = AppContext::for_tests().await;
        let _router = build_router(ctx);
    }
}
