use aws_sdk_sns::Client as SnsClient;
use sqlx::{Pool, Postgres};
use tender_core::Config;

/// The non-pool half of axum state: SNS client plus the environment `Config`, both
/// cheap to clone (an `Arc`-backed SDK client and a small value type).
#[derive(Clone)]
pub struct ApiState {
    pub sns: SnsClient,
    pub config: Config,
}

pub type AppState = (Pool<Postgres>, ApiState);
