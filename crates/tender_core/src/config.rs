use std::env;

/// Shared environment configuration. Every binary in the workspace loads a subset of
/// this via [`Config::from_env`]; fields a given binary doesn't need are simply unused.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bucket: String,
    pub prefix: String,
    pub ingest_queue_url: Option<String>,
    pub tender_topic_arn: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub throttle_ms: u64,
    pub use_concurrent: bool,
    pub tz_offset: String,
    pub aws_region: String,
}

impl Config {
    pub async fn from_env() -> anyhow::Result<Self> {
        tracing::info!("loading configuration from environment variables");

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => assemble_database_url().await?,
        };

        let bucket = env::var("BUCKET").unwrap_or_else(|_| "tenders-raw".to_string());
        let prefix = env::var("PREFIX").unwrap_or_default();
        let ingest_queue_url = env::var("INGEST_QUEUE_URL").ok();
        let tender_topic_arn = env::var("TENDER_TOPIC_ARN").ok();

        let page_size = env_parse("PAGE_SIZE", 100);
        let max_pages = env_parse("MAX_PAGES", 50);
        let throttle_ms = env_parse("THROTTLE_MS", 250);
        let use_concurrent = env::var("USE_CONCURRENT")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let tz_offset = env::var("TZ_OFFSET").unwrap_or_else(|_| "+02:00".to_string());
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "af-south-1".to_string());

        Ok(Self {
            database_url,
            bucket,
            prefix,
            ingest_queue_url,
            tender_topic_arn,
            page_size,
            max_pages,
            throttle_ms,
            use_concurrent,
            tz_offset,
            aws_region,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Builds a `postgres://` URL from the discrete `DB_*` variables, fetching the password
/// from the parameter store the one time it's needed (see [`crate::secrets`]).
async fn assemble_database_url() -> anyhow::Result<String> {
    let host = env::var("DB_HOST").map_err(|_| anyhow::anyhow!("DB_HOST not set"))?;
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let name = env::var("DB_NAME").map_err(|_| anyhow::anyhow!("DB_NAME not set"))?;
    let user = env::var("DB_USER").map_err(|_| anyhow::anyhow!("DB_USER not set"))?;
    let password = crate::secrets::fetch_db_password().await?;

    Ok(format!(
        "postgres://{user}:{password}@{host}:{port}/{name}"
    ))
}
