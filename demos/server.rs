use axum::{Router, error_handling::HandleErrorLayer, routing::get};
use meshestra_exception::prelude::*;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

async fn index() -> &'static str {
    "exception demo: try /forbidden, /anyhow, /panic or any unknown path"
}

async fn forbidden() -> Result<&'static str, HttpException> {
    Err(HttpException::new(403, "forbidden"))
}

async fn upstream() -> Result<&'static str, HttpException> {
    let err = anyhow::anyhow!("connection refused").context("upstream call failed");
    Err(err.into())
}

async fn background_panic() -> &'static str {
    // Outside the request flow; reported by the process-wide observer
    std::thread::spawn(|| panic!("background job crashed"));
    "spawned a failing background job"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting exception demo...");

    let config = ConfigService::new();
    let options = ExceptionOptionsBuilder::from_config(&config)?
        .logger(TracingLogger)
        .not_found_page("404.html")
        .renderer(FilePageRenderer::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/demos/pages"
        )))
        .build()?;

    tracing::info!("Exception options: {:?}", options);

    let router = Router::new()
        .route("/", get(index))
        .route("/forbidden", get(forbidden))
        .route("/anyhow", get(upstream))
        .route("/panic", get(background_panic))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    tracing::error!("Exception hook failed: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
                }))
                .layer(ExceptionLayer::new(options)),
        );

    let host = config.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = config.get("PORT").unwrap_or_else(|| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("✅ Server running on http://127.0.0.1:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
