mod error;
mod routes;
mod state;

use aws_config::BehaviorVersion;
use aws_sdk_sns::Client as SnsClient;
use sqlx::postgres::PgPoolOptions;
use tender_core::{db, Config};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use state::ApiState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env().await?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    db::ensure_schema(&pool).await?;

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let sns = SnsClient::new(&aws_config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
        .allow_methods(Any);

    let state: state::AppState = (pool, ApiState { sns, config });

    let app = routes::router().layer(cors).with_state(state);

    let addr = "0.0.0.0:8080";
    info!(addr, "query_api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
